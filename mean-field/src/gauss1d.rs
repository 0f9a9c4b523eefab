//! Normal-Gamma mean-field posterior for a 1-D Gaussian with unknown
//! mean and precision.
//!
//! The factorized family is `q(mu) q(tau)` with `q(mu)` Normal and
//! `q(tau)` Gamma; both factors have closed-form coordinate updates
//! given the expectations of the other.

use crate::common::*;
use design_util::error::ModelError;

/// Options for [`Gauss1D`].
#[derive(Debug, Clone)]
pub struct Gauss1DOptions {
    /// Gamma prior shape on the precision. Default: 0 (diffuse)
    pub a0: f64,
    /// Gamma prior rate on the precision. Default: 0 (diffuse)
    pub b0: f64,
    /// Prior mean. Default: 0
    pub mu0: f64,
    /// Prior precision scale on the mean. Default: 0 (diffuse)
    pub lambda0: f64,
    /// Iteration cap. Default: 1000
    pub max_iter: usize,
    /// Stop once the Euclidean distance between consecutive
    /// `(lambda, mu)` iterates falls below this. Default: 1e-2
    pub threshold: f64,
}

impl Default for Gauss1DOptions {
    fn default() -> Self {
        Gauss1DOptions {
            a0: 0.0,
            b0: 0.0,
            mu0: 0.0,
            lambda0: 0.0,
            max_iter: 1000,
            threshold: 1e-2,
        }
    }
}

/// Normal-Gamma posterior state: `tau ~ Gamma(a, b)`,
/// `mu ~ Normal(mu, lambda^-1)`.
#[derive(Debug, Clone, Copy)]
pub struct NormalGamma {
    pub a: f64,
    pub b: f64,
    pub mu: f64,
    pub lambda: f64,
}

impl NormalGamma {
    /// Posterior mean of the precision, `a / b`
    pub fn expected_precision(&self) -> f64 {
        self.a / self.b
    }
}

/// Mean-field solver for the 1-D Gaussian.
pub struct Gauss1D {
    options: Gauss1DOptions,
    posterior: NormalGamma,
}

impl Gauss1D {
    pub fn new(options: Gauss1DOptions) -> Self {
        let posterior = NormalGamma {
            a: options.a0,
            b: options.b0,
            mu: options.mu0,
            lambda: options.lambda0,
        };
        Gauss1D { options, posterior }
    }

    pub fn posterior(&self) -> &NormalGamma {
        &self.posterior
    }

    /// Fit the posterior to `x`, seeding the precision expectation with
    /// `init_tau`. Overwrites the whole posterior atomically; running
    /// out of iterations keeps the last iterate.
    pub fn fit(&mut self, x: &[f64], init_tau: f64) -> anyhow::Result<&NormalGamma> {
        if x.is_empty() {
            return Err(
                ModelError::DimensionMismatch("observations must be non-empty".into()).into(),
            );
        }

        let o = &self.options;
        let n = x.len() as f64;
        let x_sum: f64 = x.iter().sum();
        let x2_sum: f64 = x.iter().map(|v| v * v).sum();

        let mut e_tau = init_tau;
        let mut mu_n = (o.lambda0 * o.mu0 + x_sum) / (o.lambda0 + n);
        let mut lambda_n = (o.lambda0 + n) * e_tau;
        let mut a_n = o.a0;
        let mut b_n = o.b0;

        for it in 0..o.max_iter {
            let e_mu = mu_n;
            // second moment through the propagated precision
            let e_mu2 = mu_n * mu_n + 1.0 / ((lambda_n + n) * e_tau);

            a_n = o.a0 + (n + 1.0) / 2.0;
            b_n = o.b0
                + 0.5
                    * (x2_sum - 2.0 * e_mu * x_sum
                        + n * e_mu2
                        + o.lambda0 * (e_mu2 - 2.0 * e_mu * o.mu0 + o.mu0 * o.mu0));
            e_tau = a_n / b_n;

            let new_mu = (o.lambda0 * o.mu0 + x_sum) / (o.lambda0 + n);
            let new_lambda = (o.lambda0 + n) * e_tau;

            let delta =
                ((new_lambda - lambda_n).powi(2) + (new_mu - mu_n).powi(2)).sqrt();
            mu_n = new_mu;
            lambda_n = new_lambda;

            if delta < o.threshold {
                debug!("gauss1d converged after {} iterations", it + 1);
                break;
            }
        }

        self.posterior = NormalGamma {
            a: a_n,
            b: b_n,
            mu: mu_n,
            lambda: lambda_n,
        };
        Ok(&self.posterior)
    }
}
