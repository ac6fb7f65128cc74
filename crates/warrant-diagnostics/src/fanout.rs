//! Broadcast one diagnostic to several sinks.

use warrant_contracts::diagnostic::Diagnostic;
use warrant_core::traits::DiagnosticSink;

/// Forwards every diagnostic to each inner sink, in insertion order.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Box<dyn DiagnosticSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DiagnosticSink for FanOut {
    fn record(&self, diagnostic: &Diagnostic) {
        for sink in &self.sinks {
            sink.record(diagnostic);
        }
    }
}
