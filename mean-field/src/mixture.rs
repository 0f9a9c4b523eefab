//! Dirichlet x Normal-Wishart mean-field posterior for a multivariate
//! Gaussian mixture.
//!
//! Each round recomputes responsibility-weighted sufficient statistics
//! (counts, means, scatter matrices), refreshes the per-component
//! posterior records in closed form, optionally prunes components whose
//! expected mixing weight fell below a threshold, and recomputes the
//! responsibilities against the surviving components. The solver always
//! runs its full iteration budget; there is no early-stop check.
//!
//! The predictive density of a fitted mixture is a weighted sum of
//! multivariate Student-t densities, one per surviving component.

use crate::common::*;
use design_util::error::ModelError;
use design_util::numeric::safe_ln;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use special::Gamma;
use std::f64::consts::PI;

/// Options for [`GaussianMixture`].
#[derive(Debug, Clone)]
pub struct MixtureOptions {
    /// Number of mixture components K. Default: 1
    pub n_components: usize,
    /// Dirichlet prior concentration, one entry per component.
    /// Default: all ones
    pub alpha0: Option<DVec>,
    /// Prior mean shared by all components. Default: zero vector
    pub m0: Option<DVec>,
    /// Prior precision scale on the means. Default: 1
    pub beta0: f64,
    /// Wishart prior scale matrix. Default: identity
    pub w0: Option<Mat>,
    /// Wishart prior degrees of freedom. Default: 1
    pub nu0: f64,
    /// Number of coordinate-ascent rounds. Default: 1000
    pub n_iter: usize,
    /// Seed for the default responsibility initialization. Default: 42
    pub seed: u64,
}

impl Default for MixtureOptions {
    fn default() -> Self {
        MixtureOptions {
            n_components: 1,
            alpha0: None,
            m0: None,
            beta0: 1.0,
            w0: None,
            nu0: 1.0,
            n_iter: 1000,
            seed: 42,
        }
    }
}

/// Per-fit arguments for [`GaussianMixture::fit`].
#[derive(Debug, Clone)]
pub struct MixtureFitOptions {
    /// Starting N x K responsibility matrix (rows normalized); seeded
    /// uniform noise when absent
    pub initial_responsibility: Option<Mat>,
    /// Drop components whose expected mixing weight falls below
    /// `prune_threshold`. Default: false
    pub reduce_components: bool,
    /// Pruning threshold on `E[pi_k]`. Default: 1e-3
    pub prune_threshold: f64,
}

impl Default for MixtureFitOptions {
    fn default() -> Self {
        MixtureFitOptions {
            initial_responsibility: None,
            reduce_components: false,
            prune_threshold: 1e-3,
        }
    }
}

impl MixtureFitOptions {
    pub fn with_pruning(prune_threshold: f64) -> Self {
        MixtureFitOptions {
            reduce_components: true,
            prune_threshold,
            ..Default::default()
        }
    }
}

/// One component's slice of the prior and posterior. Pruning filters
/// whole records, so all K-indexed state shrinks in lock step.
#[derive(Debug)]
struct Component {
    alpha0: f64,
    alpha: f64,
    beta: f64,
    m: DVec,
    w: Mat,
    nu: f64,
}

/// Mean-field solver for the Bayesian Gaussian mixture.
#[derive(Debug)]
pub struct GaussianMixture {
    options: MixtureOptions,
    components: Vec<Component>,
    responsibility: Mat,
    dim: Option<usize>,
}

impl GaussianMixture {
    /// Build a solver with K components from the prior in `options`.
    pub fn new(options: MixtureOptions) -> anyhow::Result<Self> {
        let k = options.n_components;
        if k == 0 {
            return Err(
                ModelError::DimensionMismatch("need at least one mixture component".into())
                    .into(),
            );
        }
        let alpha0 = match &options.alpha0 {
            Some(a) => {
                if a.len() != k {
                    return Err(ModelError::DimensionMismatch(format!(
                        "prior concentration has {} entries for {} components",
                        a.len(),
                        k
                    ))
                    .into());
                }
                a.clone()
            }
            None => DVec::from_element(k, 1.0),
        };

        let components = alpha0
            .iter()
            .map(|&a0| Component {
                alpha0: a0,
                alpha: a0,
                beta: options.beta0,
                m: DVec::zeros(0),
                w: Mat::zeros(0, 0),
                nu: options.nu0,
            })
            .collect();

        Ok(GaussianMixture {
            options,
            components,
            responsibility: Mat::zeros(0, 0),
            dim: None,
        })
    }

    /// Number of surviving components
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// N x K responsibility matrix from the last fit
    pub fn responsibilities(&self) -> &Mat {
        &self.responsibility
    }

    /// Posterior Dirichlet concentrations
    pub fn concentrations(&self) -> DVec {
        DVec::from_iterator(self.components.len(), self.components.iter().map(|c| c.alpha))
    }

    /// Posterior component means
    pub fn means(&self) -> Vec<&DVec> {
        self.components.iter().map(|c| &c.m).collect()
    }

    /// Run the full coordinate-ascent budget on `x` (N x D, rows are
    /// observations).
    pub fn fit(&mut self, x: &Mat, fit_options: MixtureFitOptions) -> anyhow::Result<()> {
        let (n, d) = x.shape();
        if n == 0 {
            return Err(
                ModelError::DimensionMismatch("observations must be non-empty".into()).into(),
            );
        }
        let nf = n as f64;

        // priors sized against the data, checked before any iteration
        let m0 = match &self.options.m0 {
            Some(m) => {
                if m.len() != d {
                    return Err(ModelError::DimensionMismatch(format!(
                        "prior mean has {} entries but observations have {} dimensions",
                        m.len(),
                        d
                    ))
                    .into());
                }
                m.clone()
            }
            None => DVec::zeros(d),
        };
        let w0_inv = match &self.options.w0 {
            Some(w) => {
                if w.nrows() != d || w.ncols() != d {
                    return Err(ModelError::DimensionMismatch(format!(
                        "prior scale matrix is {}x{} but observations have {} dimensions",
                        w.nrows(),
                        w.ncols(),
                        d
                    ))
                    .into());
                }
                invert_spd(w.clone(), "prior scale matrix")?
            }
            None => Mat::identity(d, d),
        };
        let beta0 = self.options.beta0;
        let nu0 = self.options.nu0;
        let n_iter = self.options.n_iter;

        let mut r = match &fit_options.initial_responsibility {
            Some(r0) => {
                if r0.nrows() != n || r0.ncols() != self.components.len() {
                    return Err(ModelError::DimensionMismatch(format!(
                        "initial responsibility is {}x{}, expected {}x{}",
                        r0.nrows(),
                        r0.ncols(),
                        n,
                        self.components.len()
                    ))
                    .into());
                }
                r0.clone()
            }
            None => {
                let mut rng = SmallRng::seed_from_u64(self.options.seed);
                let mut r0 = Mat::from_fn(n, self.components.len(), |_, _| {
                    rng.random::<f64>() + 0.10
                });
                normalize_rows(&mut r0);
                r0
            }
        };

        for round in 0..n_iter {
            let k = self.components.len();
            let kf = k as f64;

            // responsibility-weighted sufficient statistics
            let n_k: Vec<f64> = (0..k).map(|j| r.column(j).sum()).collect();
            let mut xbar = r.transpose() * x; // K x D
            for j in 0..k {
                let inv = 1.0 / n_k[j];
                xbar.row_mut(j).iter_mut().for_each(|v| *v *= inv);
            }
            let scatter: Vec<Mat> = (0..k)
                .into_par_iter()
                .map(|j| {
                    let mut s = Mat::zeros(d, d);
                    let xbar_j = xbar.row(j).transpose();
                    for i in 0..n {
                        let diff = x.row(i).transpose() - &xbar_j;
                        s += (&diff * diff.transpose()) * r[(i, j)];
                    }
                    s / n_k[j]
                })
                .collect();

            // closed-form posterior refresh per component
            for (j, c) in self.components.iter_mut().enumerate() {
                let xbar_j = xbar.row(j).transpose();
                c.alpha = c.alpha0 + n_k[j];
                c.beta = beta0 + n_k[j];
                c.m = (&m0 * beta0 + &xbar_j * n_k[j]) / c.beta;
                let dev = &xbar_j - &m0;
                let w_inv = &w0_inv
                    + &scatter[j] * n_k[j]
                    + (&dev * dev.transpose()) * (beta0 * n_k[j] / (beta0 + n_k[j]));
                c.w = invert_spd(w_inv, "posterior scale update")?;
                c.nu = nu0 + n_k[j];
            }

            if fit_options.reduce_components {
                let keep: Vec<bool> = self
                    .components
                    .iter()
                    .zip(n_k.iter())
                    .map(|(c, &nk)| {
                        (c.alpha0 + nk) / (kf * c.alpha0 + nf) >= fit_options.prune_threshold
                    })
                    .collect();
                if keep.iter().any(|b| !*b) {
                    // one atomic filter over whole component records
                    let mut mask = keep.iter();
                    self.components.retain(|_| *mask.next().unwrap());
                    info!(
                        "round {}: pruned {} -> {} components",
                        round,
                        k,
                        self.components.len()
                    );
                }
            }

            // responsibilities against the surviving posterior
            r = self.update_responsibility(x);

            if round % 100 == 0 {
                debug!("round {}/{}: K={}", round, n_iter, self.components.len());
            }
        }

        self.responsibility = r;
        self.dim = Some(d);
        Ok(())
    }

    /// Expected log responsibilities under the current posterior,
    /// exponentiated and row-normalized. A shared per-row shift keeps
    /// the exponentials in range; it cancels in the normalization.
    fn update_responsibility(&self, x: &Mat) -> Mat {
        let (n, d) = x.shape();
        let df = d as f64;
        let k = self.components.len();

        let psi_total = self
            .components
            .iter()
            .map(|c| c.alpha)
            .sum::<f64>()
            .digamma();

        // per-component additive constant of the log responsibility
        let consts: Vec<f64> = self
            .components
            .iter()
            .map(|c| {
                let e_log_pi = c.alpha.digamma() - psi_total;
                let mut e_log_det = df * 2f64.ln() + safe_ln(c.w.determinant());
                for i in 1..=d {
                    e_log_det += (0.5 * (c.nu + 1.0 - i as f64)).digamma();
                }
                e_log_pi + 0.5 * e_log_det - 0.5 * df * (2.0 * PI).ln()
            })
            .collect();

        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let x_i = x.row(i).transpose();
                let mut rho: Vec<f64> = self
                    .components
                    .iter()
                    .zip(consts.iter())
                    .map(|(c, &c0)| {
                        let diff = &x_i - &c.m;
                        let quad = df / c.beta + c.nu * (&c.w * &diff).dot(&diff);
                        c0 - 0.5 * quad
                    })
                    .collect();

                let top = rho.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let mut total = 0.0;
                for v in rho.iter_mut() {
                    *v = (*v - top).exp();
                    total += *v;
                }
                for v in rho.iter_mut() {
                    *v /= total;
                }
                rho
            })
            .collect();

        Mat::from_row_iterator(n, k, rows.into_iter().flatten())
    }

    /// Predictive density of the fitted mixture: a Student-t per
    /// surviving component, weighted by the posterior concentrations.
    pub fn prob_density(&self, x: &Mat) -> anyhow::Result<DVec> {
        let d = self
            .dim
            .ok_or_else(|| anyhow::anyhow!("fit must be called before prob_density"))?;
        if x.ncols() != d {
            return Err(ModelError::DimensionMismatch(format!(
                "observations have {} dimensions, model was fitted with {}",
                x.ncols(),
                d
            ))
            .into());
        }
        let df = d as f64;
        let alpha_sum: f64 = self.components.iter().map(|c| c.alpha).sum();

        struct StudentT {
            weight: f64,
            ln_norm: f64,
            scale: Mat,
            location: DVec,
            nu: f64,
        }

        let pieces: Vec<StudentT> = self
            .components
            .iter()
            .map(|c| {
                let nu = c.nu + 1.0 - df;
                let scale = &c.w * (nu * c.beta / (1.0 + c.beta));
                let ln_norm = (0.5 * (df + nu)).ln_gamma().0 - (0.5 * nu).ln_gamma().0
                    + 0.5 * safe_ln(scale.determinant())
                    - 0.5 * df * (PI * nu).ln();
                StudentT {
                    weight: c.alpha,
                    ln_norm,
                    scale,
                    location: c.m.clone(),
                    nu,
                }
            })
            .collect();

        let vals: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let x_i = x.row(i).transpose();
                let mut total = 0.0;
                for t in &pieces {
                    let diff = &x_i - &t.location;
                    let maha = (&t.scale * &diff).dot(&diff);
                    let ln_pdf =
                        t.ln_norm - 0.5 * (df + t.nu) * (1.0 + maha / t.nu).ln();
                    total += t.weight * ln_pdf.exp();
                }
                total / alpha_sum
            })
            .collect();

        Ok(DVec::from_vec(vals))
    }
}

fn normalize_rows(r: &mut Mat) {
    for mut row in r.row_iter_mut() {
        let total: f64 = row.iter().sum();
        row.iter_mut().for_each(|v| *v /= total);
    }
}
