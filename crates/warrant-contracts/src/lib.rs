//! # warrant-contracts
//!
//! Shared types, schemas, and contracts for the Warrant ABAC decision core.
//!
//! Every crate in the workspace imports from here. No decision logic lives
//! in this crate, only the data types the other crates exchange.

pub mod condition;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod policy;
pub mod validation;

pub use condition::{ConditionTree, Group, Join, Leaf, Operator};
pub use context::{AuthContext, DynamicResource, Resource, Target};
pub use diagnostic::Diagnostic;
pub use error::{WarrantError, WarrantResult};
pub use policy::{ActionSet, Entitlement, Policy};
pub use validation::{ValidationFailure, ValidationReport};
