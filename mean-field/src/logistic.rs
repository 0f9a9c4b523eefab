//! Variational logistic regression through the local quadratic bound
//! on the sigmoid.
//!
//! Each observation carries a bound parameter `xi_n`; given the bound,
//! the weight posterior is Gaussian in closed form, and given the
//! weight posterior, the optimal bound parameters are available in
//! closed form. The solver composes the design-matrix and label-codec
//! collaborators rather than extending them.

use crate::common::*;
use design_util::basis::Basis;
use design_util::error::ModelError;
use design_util::labels::{ClassTargets, LabelCodec};
use design_util::numeric::{kappa, sigmoid};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Options for [`LogisticRegression`].
#[derive(Debug, Clone)]
pub struct LogisticOptions {
    /// Prior precision on the weights. Default: 0.1
    pub alpha: f64,
    /// Iteration cap. Default: 100
    pub max_iter: usize,
    /// Stop once the RMS change in `xi` falls below this. Default: 1e-2
    pub threshold: f64,
    /// Feature expansion applied to raw observations.
    /// Default: identity with a bias column
    pub basis: Basis,
    /// Seed for the default `xi` initialization. Default: 42
    pub seed: u64,
}

impl Default for LogisticOptions {
    fn default() -> Self {
        LogisticOptions {
            alpha: 1e-1,
            max_iter: 100,
            threshold: 1e-2,
            basis: Basis::Identity,
            seed: 42,
        }
    }
}

/// Per-fit arguments for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Default)]
pub struct LogisticFitOptions {
    /// Starting bound parameters, one per observation; seeded
    /// standard-normal noise when absent
    pub init_xi: Option<DVec>,
    /// Re-estimate the weight precision through its Gamma
    /// hyperposterior each round
    pub optimize_precision: bool,
    /// Gamma hyperprior shape (used when `optimize_precision`)
    pub init_a: f64,
    /// Gamma hyperprior rate (used when `optimize_precision`)
    pub init_b: f64,
}

/// Mean-field solver for two-class Bayesian logistic regression.
pub struct LogisticRegression {
    options: LogisticOptions,
    alpha: f64,
    a: f64,
    b: f64,
    weight: DVec,
    covariance: Mat,
    xi: DVec,
    codec: Option<LabelCodec>,
}

impl LogisticRegression {
    pub fn new(options: LogisticOptions) -> Self {
        let alpha = options.alpha;
        LogisticRegression {
            options,
            alpha,
            a: 0.0,
            b: 0.0,
            weight: DVec::zeros(0),
            covariance: Mat::zeros(0, 0),
            xi: DVec::zeros(0),
            codec: None,
        }
    }

    /// Posterior weight mean
    pub fn weight(&self) -> &DVec {
        &self.weight
    }

    /// Posterior weight covariance
    pub fn covariance(&self) -> &Mat {
        &self.covariance
    }

    /// Converged local bound parameters
    pub fn xi(&self) -> &DVec {
        &self.xi
    }

    /// Current weight precision (re-estimated when fitting with
    /// `optimize_precision`)
    pub fn precision(&self) -> f64 {
        self.alpha
    }

    /// Fit the weight posterior to `(x, y)`. `y` must encode exactly
    /// two classes, as labels or one-hot rows.
    pub fn fit(
        &mut self,
        x: &Mat,
        y: &ClassTargets,
        fit_options: LogisticFitOptions,
    ) -> anyhow::Result<()> {
        let (codec, t) = LabelCodec::fit(y)?;
        let phi = self.options.basis.design_matrix(x)?;
        let (n, m) = phi.shape();
        if t.len() != n {
            return Err(ModelError::DimensionMismatch(format!(
                "{} targets for {} observations",
                t.len(),
                n
            ))
            .into());
        }

        let mut xi = match &fit_options.init_xi {
            Some(v) => {
                if v.len() != n {
                    return Err(ModelError::DimensionMismatch(format!(
                        "initial xi has {} entries for {} observations",
                        v.len(),
                        n
                    ))
                    .into());
                }
                v.clone()
            }
            None => {
                let mut rng = SmallRng::seed_from_u64(self.options.seed);
                DVec::from_fn(n, |_, _| {
                    let v: f64 = StandardNormal.sample(&mut rng);
                    v
                })
            }
        };

        self.a = fit_options.init_a;
        self.b = fit_options.init_b;

        let shifted = t.map(|v| v - 0.5);
        let mut s = Mat::identity(m, m);
        let mut weight = DVec::zeros(m);

        for it in 0..self.options.max_iter {
            // E-step: Gaussian weight posterior under the current bound
            let lam = xi.map(lambda_xi);
            let mut wphi = phi.clone();
            for i in 0..n {
                wphi.row_mut(i).iter_mut().for_each(|v| *v *= lam[i]);
            }
            let precision = Mat::identity(m, m) * self.alpha + phi.transpose() * wphi * 2.0;
            s = invert_spd(precision, "weight posterior precision")?;
            weight = &s * (phi.transpose() * &shifted);

            // M-step: refresh the bound (and optionally the precision)
            let e_wwt = &s + &weight * weight.transpose();
            if fit_options.optimize_precision {
                self.a = fit_options.init_a + m as f64 / 2.0;
                self.b = fit_options.init_b + 0.5 * e_wwt.trace();
                self.alpha = self.a / self.b;
            }
            let new_xi = (&phi * &e_wwt).component_mul(&phi).column_sum().map(f64::sqrt);

            let rms = ((&xi - &new_xi).norm_squared() / n as f64).sqrt();
            xi = new_xi;
            if rms < self.options.threshold {
                debug!("logistic bound converged after {} iterations", it + 1);
                break;
            }
        }

        self.weight = weight;
        self.covariance = s;
        self.xi = xi;
        self.codec = Some(codec);
        Ok(())
    }

    /// Hard class predictions in the encoding convention used at fit
    /// time.
    pub fn predict(&self, x: &Mat) -> anyhow::Result<ClassTargets> {
        let codec = self
            .codec
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("fit must be called before predict"))?;
        let logit = self.logits(x)?;
        let labels = logit.map(|v| if v >= 0.0 { 1.0 } else { 0.0 });
        Ok(codec.decode(&labels))
    }

    /// Calibrated class-1 probabilities: the logit is moderated by the
    /// predictive variance before the sigmoid.
    pub fn predict_proba(&self, x: &Mat) -> anyhow::Result<DVec> {
        if self.codec.is_none() {
            anyhow::bail!("fit must be called before predict_proba");
        }
        let phi = self.options.basis.design_matrix(x)?;
        self.check_features(&phi)?;
        let logit = &phi * &self.weight;
        let sigma = (&phi * &self.covariance).component_mul(&phi).column_sum();
        Ok(logit.zip_map(&sigma, |l, sg| sigmoid(kappa(sg) * l)))
    }

    fn logits(&self, x: &Mat) -> anyhow::Result<DVec> {
        let phi = self.options.basis.design_matrix(x)?;
        self.check_features(&phi)?;
        Ok(&phi * &self.weight)
    }

    fn check_features(&self, phi: &Mat) -> anyhow::Result<()> {
        if phi.ncols() != self.weight.len() {
            return Err(ModelError::DimensionMismatch(format!(
                "design matrix has {} features, model was fitted with {}",
                phi.ncols(),
                self.weight.len()
            ))
            .into());
        }
        Ok(())
    }
}

/// Local bound coefficient `(sigmoid(xi) - 0.5) / (2 xi)`, with the
/// `xi = 0` limit 1/8 special-cased instead of dividing by zero.
fn lambda_xi(xi: f64) -> f64 {
    if xi == 0.0 {
        0.125
    } else {
        (sigmoid(xi) - 0.5) / (2.0 * xi)
    }
}
