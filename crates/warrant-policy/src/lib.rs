//! # warrant-policy
//!
//! A TOML-driven entitlement store for the Warrant access-control façade.
//!
//! ## Overview
//!
//! This crate provides [`TomlPolicySource`], which implements the
//! [`PolicySource`](warrant_core::traits::PolicySource) trait. Entitlements
//! are declared in a TOML file; each groups per-action policies for one
//! resource type. A lookup returns every matching policy's condition tree in
//! declaration order, so earlier entitlements are evaluated first.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warrant_policy::TomlPolicySource;
//!
//! let source = TomlPolicySource::from_file(Path::new("policies/documents.toml"))?;
//! let actions = source.action_set().clone();
//! let evaluator = source.evaluator();
//! let control = AccessControl::new(actions, Box::new(source), Box::new(sink))
//!     .with_evaluator(Box::new(evaluator));
//! ```

pub mod engine;
pub mod rule;

pub use engine::TomlPolicySource;
pub use rule::PolicyConfig;

// ── Tests ─────────────────────────────────────────────────────────────────────
