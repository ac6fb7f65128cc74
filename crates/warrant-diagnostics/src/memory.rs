//! In-memory implementation of `DiagnosticSink`.
//!
//! `InMemoryDiagnostics` keeps every diagnostic in a `Vec` behind a `Mutex`,
//! so it can be shared between the façade and whoever inspects it. Cloning
//! the sink shares the same buffer.
//!
//! Useful for tests, for the demo CLI, and for integrators that want to
//! batch diagnostics into their own reporting channel.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use warrant_contracts::{
    diagnostic::Diagnostic,
    error::{WarrantError, WarrantResult},
};
use warrant_core::traits::DiagnosticSink;

use crate::event::DiagnosticEvent;

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryState {
    pub(crate) events: Vec<DiagnosticEvent>,
    pub(crate) sequence: u64,
}

// ── Public sink ───────────────────────────────────────────────────────────────

/// An append-only, in-memory diagnostic sink.
#[derive(Clone, Default)]
pub struct InMemoryDiagnostics {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every event recorded so far, in order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.lock().events.clone()
    }

    /// The recorded diagnostics without their envelopes.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().events.iter().map(|e| e.diagnostic.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Count recorded diagnostics matching `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| predicate(&e.diagnostic))
            .count()
    }

    /// Drop every recorded event. Sequence numbering continues.
    pub fn clear(&self) {
        self.lock().events.clear();
    }

    /// Export the recorded events as newline-delimited JSON.
    pub fn export_json_lines(&self) -> WarrantResult<String> {
        let state = self.lock();
        let mut out = String::new();
        for event in &state.events {
            let line = serde_json::to_string(event).map_err(|e| WarrantError::Config {
                reason: format!("failed to serialize diagnostic event: {e}"),
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    // A poisoned lock only means another recorder panicked mid-push; the
    // buffer itself is still a valid Vec.
    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── DiagnosticSink impl ───────────────────────────────────────────────────────

impl DiagnosticSink for InMemoryDiagnostics {
    fn record(&self, diagnostic: &Diagnostic) {
        let mut state = self.lock();
        let sequence = state.sequence;

        debug!(sequence, %diagnostic, "diagnostic recorded");

        state.events.push(DiagnosticEvent {
            sequence,
            recorded_at: Utc::now(),
            diagnostic: diagnostic.clone(),
        });
        state.sequence += 1;
    }
}
