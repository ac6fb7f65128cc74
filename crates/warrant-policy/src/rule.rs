//! Policy document schema.
//!
//! A `PolicyConfig` is deserialized from TOML. It names the façade's action
//! set and holds an ordered list of entitlements. Lookups return condition
//! trees in entitlement declaration order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use warrant_contracts::{
    error::{WarrantError, WarrantResult},
    policy::{ActionSet, Entitlement},
};
use warrant_core::evaluator::DEFAULT_MAX_DEPTH;

/// The top-level structure deserialized from a TOML policy file.
///
/// Example:
/// ```toml
/// actions = ["read", "update"]
///
/// [[entitlements]]
/// id = 1
/// title = "Document owners"
/// description = "Owners may read their documents"
/// resource_type = "doc"
///
/// [entitlements.policies.read]
/// requires_resource = true
/// conditions = { left = "subject.id", op = "eq", right = "resource.owner_id" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// The actions every checker set is built from, in order.
    pub actions: ActionSet,

    /// Maximum group nesting the evaluator accepts.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Ordered entitlements. Earlier entitlements' policies are tried first.
    #[serde(default)]
    pub entitlements: Vec<Entitlement>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl PolicyConfig {
    /// Check cross-references the schema alone cannot express.
    ///
    /// Returns `WarrantError::Config` when an entitlement id repeats, when
    /// a policy is keyed by an action outside `actions`, or when
    /// `max_depth` is zero.
    pub fn validate(&self) -> WarrantResult<()> {
        if self.max_depth == 0 {
            return Err(WarrantError::Config {
                reason: "max_depth must be at least 1".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entitlement in &self.entitlements {
            if !seen.insert(entitlement.id) {
                return Err(WarrantError::Config {
                    reason: format!("duplicate entitlement id {}", entitlement.id),
                });
            }
            if entitlement.resource_type.trim().is_empty() {
                return Err(WarrantError::Config {
                    reason: format!("entitlement {} has an empty resource_type", entitlement.id),
                });
            }
            for action in entitlement.policies.keys() {
                if !self.actions.contains(action) {
                    return Err(WarrantError::Config {
                        reason: format!(
                            "entitlement {} defines a policy for unknown action '{}'",
                            entitlement.id, action
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
