//! Error taxonomy for core operations.
//!
//! Failures fall into four classes with distinct handling:
//!
//! | Variant | Class | Handling |
//! |---------|-------|----------|
//! | [`Error::InvalidInput`] | input validation | rejected before any model call |
//! | [`Error::ModelUnavailable`] | capability unavailable | fixed per-feature message |
//! | [`Error::NotFound`] | missing entity | surfaced to the caller as-is |
//! | [`Error::Internal`] | unexpected | logged with context, generic failure |
//!
//! Per-unit failures (a single chunk failing to score) are deliberately
//! *not* represented here: the aggregators log and skip the unit, and the
//! batch succeeds. Only batch-level outcomes become an `Error`.

use thiserror::Error;

/// Core failure type. See the module docs for the taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    /// The request was malformed before any work happened.
    #[error("{0}")]
    InvalidInput(String),

    /// A required model capability is not available. The string names the
    /// feature so each endpoint surfaces a distinct message.
    #[error("{0} model not available")]
    ModelUnavailable(&'static str),

    /// A referenced document or workspace does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Unexpected failure from the store or another collaborator.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
