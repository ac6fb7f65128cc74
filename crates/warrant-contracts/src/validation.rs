//! Policy validation report types.
//!
//! Produced by the load-time validator. A failing report means the tree
//! must not reach the evaluator.

use serde::{Deserialize, Serialize};

/// The result of validating one or more condition trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True only if no rule failed.
    pub passed: bool,
    /// Every failure found. Empty on pass.
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self {
            passed: failures.is_empty(),
            failures,
        }
    }

    /// Append another report's failures to this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.failures.extend(other.failures);
        self.passed = self.failures.is_empty();
    }

    /// All failure messages joined for logging or error reasons.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.rule_id, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A single failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Identifier of the rule that failed, e.g. `unknown-operator`.
    pub rule_id: String,
    /// Human-readable explanation.
    pub message: String,
}

impl ValidationFailure {
    pub fn new(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}
