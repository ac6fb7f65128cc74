//! # warrant-diagnostics
//!
//! Diagnostic sinks for the Warrant access-control façade.
//!
//! ## Overview
//!
//! The façade reports coverage gaps and absorbed faults through the
//! `DiagnosticSink` trait.
//! This crate provides the sinks an integrator usually wants:
//!
//! - [`TracingDiagnostics`]: structured `tracing` events (`warn` / `error`)
//! - [`InMemoryDiagnostics`]: an inspectable, append-only buffer
//! - [`FanOut`]: sends each diagnostic to several sinks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warrant_diagnostics::{FanOut, InMemoryDiagnostics, TracingDiagnostics};
//!
//! let recorded = InMemoryDiagnostics::new();
//! let sink = FanOut::new()
//!     .with(Box::new(TracingDiagnostics))
//!     .with(Box::new(recorded.clone()));
//! let control = AccessControl::new(actions, source, Box::new(sink));
//! ```

pub mod event;
pub mod fanout;
pub mod memory;
pub mod trace;

pub use event::DiagnosticEvent;
pub use fanout::FanOut;
pub use memory::InMemoryDiagnostics;
pub use trace::TracingDiagnostics;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use warrant_contracts::{
        condition::ConditionTree,
        context::DynamicResource,
        diagnostic::Diagnostic,
        error::{WarrantError, WarrantResult},
        policy::ActionSet,
    };
    use warrant_core::{traits::DiagnosticSink, traits::PolicySource, AccessControl};

    use super::{FanOut, InMemoryDiagnostics, TracingDiagnostics};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn gap(action: &str) -> Diagnostic {
        Diagnostic::NoPolicyFound {
            resource_type: "doc".to_string(),
            action: action.to_string(),
        }
    }

    /// Returns no policies for `read` and fails for everything else.
    struct PatchySource;

    #[async_trait]
    impl PolicySource<serde_json::Value> for PatchySource {
        async fn get_conditions(
            &self,
            _subject: &serde_json::Value,
            _resource_type: &str,
            action: &str,
            _requires_resource: bool,
        ) -> WarrantResult<Vec<ConditionTree>> {
            if action == "read" {
                Ok(vec![])
            } else {
                Err(WarrantError::PolicySource {
                    reason: "store offline".to_string(),
                })
            }
        }
    }

    // ── InMemoryDiagnostics ───────────────────────────────────────────────────

    #[test]
    fn test_sequence_monotonic() {
        let sink = InMemoryDiagnostics::new();
        sink.record(&gap("a"));
        sink.record(&gap("b"));
        sink.record(&gap("c"));

        for (idx, event) in sink.events().iter().enumerate() {
            assert_eq!(event.sequence, idx as u64);
        }
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_clones_share_the_buffer() {
        let sink = InMemoryDiagnostics::new();
        let observer = sink.clone();
        sink.record(&gap("read"));

        assert_eq!(observer.diagnostics(), vec![gap("read")]);
    }

    #[test]
    fn test_clear_keeps_sequence_running() {
        let sink = InMemoryDiagnostics::new();
        sink.record(&gap("a"));
        sink.clear();
        assert!(sink.is_empty());

        sink.record(&gap("b"));
        assert_eq!(sink.events()[0].sequence, 1);
    }

    #[test]
    fn test_export_json_lines() {
        let sink = InMemoryDiagnostics::new();
        sink.record(&gap("read"));
        sink.record(&Diagnostic::EvaluationFailure {
            resource_type: "doc".to_string(),
            action: "update".to_string(),
            error: "bad tree".to_string(),
        });

        let exported = sink.export_json_lines().unwrap();
        let lines: Vec<&str> = exported.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["diagnostic"]["kind"], "evaluation_failure");
        assert_eq!(second["diagnostic"]["error"], "bad tree");
    }

    // ── FanOut and TracingDiagnostics ─────────────────────────────────────────

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = InMemoryDiagnostics::new();
        let second = InMemoryDiagnostics::new();
        let fanout = FanOut::new()
            .with(Box::new(TracingDiagnostics))
            .with(Box::new(first.clone()))
            .with(Box::new(second.clone()));

        fanout.record(&gap("read"));

        assert_eq!(fanout.len(), 3);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    // ── Wired into the façade ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_facade_reports_gap_and_failure_distinctly() {
        let recorded = InMemoryDiagnostics::new();
        let control: AccessControl<serde_json::Value> = AccessControl::new(
            ActionSet::new(["read", "update"]).unwrap(),
            Box::new(PatchySource),
            Box::new(recorded.clone()),
        );

        let permissions = control.can(serde_json::json!({ "id": 1 }));
        let resource = DynamicResource::new("doc");
        assert!(!permissions.action("read").unwrap().resource(&resource).await);
        assert!(!permissions.action("update").unwrap().resource(&resource).await);

        assert_eq!(recorded.count_where(|d| !d.is_failure()), 1);
        assert_eq!(
            recorded.count_where(|d| matches!(d, Diagnostic::PolicySourceFailure { .. })),
            1
        );
        assert_eq!(recorded.diagnostics()[0], gap("read"));
    }
}
