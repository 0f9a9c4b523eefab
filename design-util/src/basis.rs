//! Basis-function expansion of raw observations into a design matrix.

use crate::error::ModelError;
use crate::numeric::sigmoid;
use nalgebra::DMatrix;

/// Basis family for turning N x D observations into an N x M design
/// matrix. Every family prepends a bias column of ones.
#[derive(Debug, Clone)]
pub enum Basis {
    /// `[1 | x]`
    Identity,
    /// Radial features `exp(-||x - c_j||^2 / (2 s^2))`, one per centre
    /// (centres are rows of a J x D matrix)
    Gaussian { centres: DMatrix<f64>, scale: f64 },
    /// Sigmoidal ramp per centre, `sigmoid(mean_d(x_d - c_jd) / s)`
    Sigmoid { centres: DMatrix<f64>, scale: f64 },
    /// Coordinate powers `x_d^p` for `p = 1..=degree`
    Polynomial { degree: usize },
}

impl Default for Basis {
    fn default() -> Self {
        Basis::Identity
    }
}

impl Basis {
    /// Expand `x` (N x D, rows are observations) into the design matrix.
    pub fn design_matrix(&self, x: &DMatrix<f64>) -> anyhow::Result<DMatrix<f64>> {
        let (n, d) = x.shape();

        match self {
            Basis::Identity => {
                let mut phi = DMatrix::zeros(n, d + 1);
                phi.column_mut(0).fill(1.0);
                phi.view_mut((0, 1), (n, d)).copy_from(x);
                Ok(phi)
            }
            Basis::Gaussian { centres, scale } => {
                check_centres(centres, d)?;
                let j = centres.nrows();
                let denom = 2.0 * scale * scale;
                let mut phi = DMatrix::zeros(n, j + 1);
                phi.column_mut(0).fill(1.0);
                for i in 0..n {
                    for c in 0..j {
                        let dist2 = (x.row(i) - centres.row(c)).norm_squared();
                        phi[(i, c + 1)] = (-dist2 / denom).exp();
                    }
                }
                Ok(phi)
            }
            Basis::Sigmoid { centres, scale } => {
                check_centres(centres, d)?;
                let j = centres.nrows();
                let mut phi = DMatrix::zeros(n, j + 1);
                phi.column_mut(0).fill(1.0);
                for i in 0..n {
                    for c in 0..j {
                        let shift = (x.row(i) - centres.row(c)).mean();
                        phi[(i, c + 1)] = sigmoid(shift / scale);
                    }
                }
                Ok(phi)
            }
            Basis::Polynomial { degree } => {
                let mut phi = DMatrix::zeros(n, 1 + d * degree);
                phi.column_mut(0).fill(1.0);
                for i in 0..n {
                    for dd in 0..d {
                        let mut pow = 1.0;
                        for p in 0..*degree {
                            pow *= x[(i, dd)];
                            phi[(i, 1 + dd * degree + p)] = pow;
                        }
                    }
                }
                Ok(phi)
            }
        }
    }
}

fn check_centres(centres: &DMatrix<f64>, d: usize) -> anyhow::Result<()> {
    if centres.ncols() != d {
        return Err(ModelError::DimensionMismatch(format!(
            "basis centres have {} columns but observations have {} dimensions",
            centres.ncols(),
            d
        ))
        .into());
    }
    Ok(())
}
