//! Data-quality failure taxonomy

mod failure;

pub use failure::{DQFailure, FailureKind, UnknownFailureKind};
