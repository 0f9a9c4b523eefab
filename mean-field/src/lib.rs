//! Coordinate-ascent variational Bayes.
//!
//! Three self-contained mean-field solvers, each alternating closed-form
//! updates of one variational factor given the current expectations of
//! the others:
//!
//! - [`Gauss1D`]: Normal-Gamma posterior over the mean and precision of
//!   a 1-D Gaussian
//! - [`GaussianMixture`]: Dirichlet x Normal-Wishart posterior over the
//!   weights, means, and precision matrices of a multivariate Gaussian
//!   mixture, with optional component pruning and a Student-t
//!   predictive density
//! - [`LogisticRegression`]: Gaussian posterior over classifier weights
//!   through a per-observation quadratic bound on the sigmoid
//!
//! Exhausting an iteration budget is never an error; each solver simply
//! keeps its last iterate.

pub mod common;

/// Normal-Gamma factorized posterior for a 1-D Gaussian
pub mod gauss1d;

/// Dirichlet x Normal-Wishart mixture posterior
pub mod mixture;

/// Local-bound variational logistic regression
pub mod logistic;

pub use gauss1d::{Gauss1D, Gauss1DOptions, NormalGamma};
pub use logistic::{LogisticFitOptions, LogisticOptions, LogisticRegression};
pub use mixture::{GaussianMixture, MixtureFitOptions, MixtureOptions};
