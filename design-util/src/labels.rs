//! Two-class target encoding shared by the classifiers.

use crate::error::ModelError;
use nalgebra::{DMatrix, DVector};

/// Class targets in either of the two accepted conventions.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassTargets {
    /// One entry per observation; any two distinct values
    Labels(DVector<f64>),
    /// One row per observation, exactly two columns
    OneHot(DMatrix<f64>),
}

/// Remembers the convention and class values observed at fit time so
/// predictions can be mapped back to the caller's encoding.
#[derive(Debug, Clone)]
pub struct LabelCodec {
    one_hot: bool,
    classes: [f64; 2],
}

impl LabelCodec {
    /// Learn the encoding from `y` and return the codec together with
    /// the 0/1 target vector. Fails with `InvalidLabel` unless `y`
    /// encodes exactly two classes.
    pub fn fit(y: &ClassTargets) -> anyhow::Result<(Self, DVector<f64>)> {
        match y {
            ClassTargets::Labels(v) => {
                let mut classes: Vec<f64> = v.iter().cloned().collect();
                classes.sort_by(f64::total_cmp);
                classes.dedup();
                if classes.len() != 2 {
                    return Err(ModelError::InvalidLabel(format!(
                        "expected exactly two classes, found {}",
                        classes.len()
                    ))
                    .into());
                }
                let hi = classes[1];
                let encoded = v.map(|val| if val == hi { 1.0 } else { 0.0 });
                let codec = LabelCodec {
                    one_hot: false,
                    classes: [classes[0], classes[1]],
                };
                Ok((codec, encoded))
            }
            ClassTargets::OneHot(m) => {
                if m.ncols() != 2 {
                    return Err(ModelError::InvalidLabel(format!(
                        "one-hot targets must have exactly two columns, found {}",
                        m.ncols()
                    ))
                    .into());
                }
                // row-wise argmax, ties resolve to class 0
                let encoded = DVector::from_iterator(
                    m.nrows(),
                    m.row_iter().map(|r| if r[1] > r[0] { 1.0 } else { 0.0 }),
                );
                let codec = LabelCodec {
                    one_hot: true,
                    classes: [0.0, 1.0],
                };
                Ok((codec, encoded))
            }
        }
    }

    /// Map a 0/1 vector back to the convention observed at fit time.
    pub fn decode(&self, y01: &DVector<f64>) -> ClassTargets {
        if self.one_hot {
            let mut out = DMatrix::zeros(y01.len(), 2);
            for (i, &v) in y01.iter().enumerate() {
                let j = if v >= 0.5 { 1 } else { 0 };
                out[(i, j)] = 1.0;
            }
            ClassTargets::OneHot(out)
        } else {
            ClassTargets::Labels(
                y01.map(|v| if v >= 0.5 { self.classes[1] } else { self.classes[0] }),
            )
        }
    }

    pub fn is_one_hot(&self) -> bool {
        self.one_hot
    }
}
