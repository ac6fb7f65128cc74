//! Diagnostic events emitted by the access-control façade.
//!
//! A checker only ever returns `true` or `false`. Why a request was denied
//! for a reason other than its conditions is reported here, through the
//! injected `DiagnosticSink`, and never through the return value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A coverage gap or an absorbed fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The policy source returned no condition trees.
    NoPolicyFound { resource_type: String, action: String },

    /// The policy source call failed; the request was denied.
    PolicySourceFailure {
        resource_type: String,
        action: String,
        error: String,
    },

    /// Building the context or evaluating a tree failed; the request was denied.
    EvaluationFailure {
        resource_type: String,
        action: String,
        error: String,
    },
}

impl Diagnostic {
    pub fn resource_type(&self) -> &str {
        match self {
            Self::NoPolicyFound { resource_type, .. }
            | Self::PolicySourceFailure { resource_type, .. }
            | Self::EvaluationFailure { resource_type, .. } => resource_type,
        }
    }

    pub fn action(&self) -> &str {
        match self {
            Self::NoPolicyFound { action, .. }
            | Self::PolicySourceFailure { action, .. }
            | Self::EvaluationFailure { action, .. } => action,
        }
    }

    /// The underlying error message, for the two failure variants.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::NoPolicyFound { .. } => None,
            Self::PolicySourceFailure { error, .. } | Self::EvaluationFailure { error, .. } => {
                Some(error)
            }
        }
    }

    /// True for the two fault variants, false for a coverage gap.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::NoPolicyFound { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPolicyFound { resource_type, action } => {
                write!(f, "no policy found for ({resource_type}, {action})")
            }
            Self::PolicySourceFailure { resource_type, action, error } => {
                write!(f, "policy source failed for ({resource_type}, {action}): {error}")
            }
            Self::EvaluationFailure { resource_type, action, error } => {
                write!(f, "evaluation failed for ({resource_type}, {action}): {error}")
            }
        }
    }
}
