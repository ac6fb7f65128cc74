//! Core trait definitions for the Warrant decision pipeline.
//!
//! These three traits are the seams of the access-control façade:
//!
//! - `PolicySource`: external collaborator supplying condition trees
//! - `Evaluator`: decides a single condition tree against a context
//! - `DiagnosticSink`: receives coverage gaps and absorbed faults
//!
//! The façade wires them together; it never lets an error from any of them
//! turn into an allow decision.

use async_trait::async_trait;

use warrant_contracts::{
    condition::ConditionTree, context::AuthContext, diagnostic::Diagnostic,
    error::WarrantResult,
};

/// Supplies the condition trees that apply to one request.
///
/// Implementations are **external**: a database-backed entitlement store, a
/// remote policy service, or a file loaded at startup. The façade calls this
/// exactly once per checker invocation and never retries or caches.
#[async_trait]
pub trait PolicySource<S: ?Sized>: Send + Sync {
    /// Return the ordered condition trees for `(subject, resource_type, action)`.
    ///
    /// `requires_resource` is true when the caller asked about a concrete
    /// resource instance rather than a bare resource type. An empty vector
    /// means no policy covers the request. The order is significant: trees
    /// are evaluated first to last and the first one granting access wins.
    async fn get_conditions(
        &self,
        subject: &S,
        resource_type: &str,
        action: &str,
        requires_resource: bool,
    ) -> WarrantResult<Vec<ConditionTree>>;
}

/// Decides one condition tree against one context.
///
/// Implementations must be pure and deterministic.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, tree: &ConditionTree, ctx: &AuthContext) -> WarrantResult<bool>;
}

/// The observability channel the façade reports diagnostics to.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: &Diagnostic);
}
