//! A `DiagnosticSink` that writes to `tracing`.
//!
//! Coverage gaps are logged at `warn`, absorbed faults at `error`, each with
//! structured `resource_type` / `action` fields so operators can alert on
//! missing authorization coverage separately from failures.

use tracing::{error, warn};

use warrant_contracts::diagnostic::Diagnostic;
use warrant_core::traits::DiagnosticSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn record(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::NoPolicyFound { resource_type, action } => {
                warn!(
                    resource_type = %resource_type,
                    action = %action,
                    "no policy found; denying"
                );
            }
            Diagnostic::PolicySourceFailure { resource_type, action, error } => {
                error!(
                    resource_type = %resource_type,
                    action = %action,
                    error = %error,
                    "policy source failed; denying"
                );
            }
            Diagnostic::EvaluationFailure { resource_type, action, error } => {
                error!(
                    resource_type = %resource_type,
                    action = %action,
                    error = %error,
                    "policy evaluation failed; denying"
                );
            }
        }
    }
}
