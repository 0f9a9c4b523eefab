#![allow(dead_code)]

pub use log::{debug, info};

use design_util::error::ModelError;

pub type Mat = nalgebra::DMatrix<f64>;
pub type DVec = nalgebra::DVector<f64>;

/// Invert a symmetric positive-definite matrix through its Cholesky
/// factor. Failure means the update that produced `mat` degenerated.
pub fn invert_spd(mat: Mat, what: &str) -> anyhow::Result<Mat> {
    match mat.cholesky() {
        Some(chol) => Ok(chol.inverse()),
        None => Err(ModelError::NumericalInstability(format!(
            "{} is not positive definite",
            what
        ))
        .into()),
    }
}
