//! Scalar primitives consumed elementwise by the solvers.

use std::f64::consts::PI;

/// Logistic sigmoid `1 / (1 + exp(-x))`
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Natural log clamped away from zero so that non-positive inputs
/// yield a large negative value instead of NaN
pub fn safe_ln(x: f64) -> f64 {
    x.max(f64::MIN_POSITIVE).ln()
}

/// Logit moderation factor `(1 + pi * sigma / 8)^{-1/2}`
///
/// Shrinks a predictive logit toward zero as the predictive variance
/// `sigma` grows; monotone decreasing in `sigma`.
pub fn kappa(sigma: f64) -> f64 {
    (1.0 + PI * sigma / 8.0).powf(-0.5)
}
