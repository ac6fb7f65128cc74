//! # warrant-core
//!
//! The attribute-based access-control decision core.
//!
//! This crate provides:
//! - The three seam traits (`PolicySource`, `Evaluator`, `DiagnosticSink`)
//! - The pure condition-tree evaluator and its default `TreeEvaluator`
//! - The fail-closed `AccessControl` façade
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warrant_core::{AccessControl, traits::PolicySource};
//!
//! let control: AccessControl<User> = AccessControl::new(actions, Box::new(source), Box::new(sink));
//! let permissions = control.can(user);
//! let allowed = permissions.action("read").unwrap().resource(&document).await;
//! ```

pub mod access;
pub mod evaluator;
pub mod traits;

pub use access::{AccessControl, ActionChecker, Permissions};
pub use evaluator::{evaluate, resolve_path, try_evaluate, TreeEvaluator, DEFAULT_MAX_DEPTH};
