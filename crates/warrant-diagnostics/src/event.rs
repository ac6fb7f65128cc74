//! Recorded diagnostic events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warrant_contracts::diagnostic::Diagnostic;

/// One diagnostic as kept by `InMemoryDiagnostics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Position in the recording order, starting at 0.
    pub sequence: u64,

    /// Wall-clock time (UTC) the sink received the diagnostic.
    pub recorded_at: DateTime<Utc>,

    pub diagnostic: Diagnostic,
}
