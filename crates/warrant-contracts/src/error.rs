//! Error types for the Warrant decision pipeline.
//!
//! All fallible operations in the workspace return `WarrantResult<T>`.
//! None of these errors ever reach the caller of an action checker: the
//! façade converts them into a deny plus a diagnostic.

use thiserror::Error;

/// The unified error type for the Warrant crates.
#[derive(Debug, Error)]
pub enum WarrantError {
    /// The policy source failed or rejected the lookup.
    #[error("policy source failure: {reason}")]
    PolicySource { reason: String },

    /// A condition tree could not be evaluated.
    #[error("evaluation failure: {reason}")]
    Evaluation { reason: String },

    /// A condition tree nests groups deeper than the configured bound.
    #[error("condition tree nesting exceeds maximum depth of {max_depth}")]
    NestingTooDeep { max_depth: usize },

    /// The subject or resource could not be turned into an evaluation context.
    #[error("failed to build evaluation context: {reason}")]
    Context { reason: String },

    /// A condition tree was rejected by load-time validation.
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    /// A configuration document or value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the Warrant crates.
pub type WarrantResult<T> = Result<T, WarrantError>;
