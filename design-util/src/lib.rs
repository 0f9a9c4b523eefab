//! Collaborator utilities for the mean-field solvers: basis-function
//! design matrices, two-class label encoding, and the scalar numeric
//! primitives (sigmoid, guarded log, logit moderation) the solvers
//! consume as black boxes.

pub mod basis;
pub mod error;
pub mod labels;
pub mod numeric;

pub use basis::Basis;
pub use error::ModelError;
pub use labels::{ClassTargets, LabelCodec};
