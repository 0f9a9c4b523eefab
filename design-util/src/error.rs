use thiserror::Error;

/// Typed failures shared by the collaborators and the solvers built on
/// top of them. Everything else goes through `anyhow` untyped.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Hyperparameter or initial-value shape disagrees with the data
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Target vector does not encode exactly two classes
    #[error("invalid label encoding: {0}")]
    InvalidLabel(String),

    /// A posterior update produced a matrix that cannot be inverted
    #[error("numerical instability detected: {0}")]
    NumericalInstability(String),
}
