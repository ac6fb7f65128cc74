//! # warrant-verify
//!
//! Load-time validation of condition trees for the Warrant ABAC core.
//!
//! Paths inside a condition tree are plain strings, so a typo like
//! `subject.rol` silently evaluates to `undefined` and denies. This crate
//! catches such mistakes once, when policies are loaded, instead of on every
//! decision.
//!
//! - [`PolicyValidator`] runs JSON Schema structural checks and path/operator
//!   semantic checks, returning a `ValidationReport`.
//! - [`ValidatingPolicySource`] wraps any policy source so invalid trees
//!   never reach the evaluator.

pub mod engine;
pub mod source;

pub use engine::{condition_tree_schema, PolicyValidator};
pub use source::ValidatingPolicySource;

// ── Tests ─────────────────────────────────────────────────────────────────────
