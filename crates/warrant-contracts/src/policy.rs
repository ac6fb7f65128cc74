//! Policies, entitlements, and the configured action set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    condition::ConditionTree,
    error::{WarrantError, WarrantResult},
};

/// One rule bundle for a (resource type, action) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Whether the conditions need a concrete resource instance in context.
    pub requires_resource: bool,
    pub conditions: ConditionTree,
}

/// A named grouping of per-action policies for one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub resource_type: String,
    /// Action name to policy. Actions without a policy are simply absent.
    #[serde(default)]
    pub policies: BTreeMap<String, Policy>,
}

impl Entitlement {
    pub fn policy_for(&self, action: &str) -> Option<&Policy> {
        self.policies.get(action)
    }
}

/// The ordered, duplicate-free set of action names an access-control
/// façade is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ActionSet(Vec<String>);

impl ActionSet {
    /// Build an action set, preserving order.
    ///
    /// Returns `WarrantError::Config` on an empty name or a duplicate.
    pub fn new<I, T>(actions: I) -> WarrantResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for action in actions {
            let action = action.into();
            if action.trim().is_empty() {
                return Err(WarrantError::Config {
                    reason: "action names must not be empty".to_string(),
                });
            }
            if names.contains(&action) {
                return Err(WarrantError::Config {
                    reason: format!("duplicate action '{action}' in action set"),
                });
            }
            names.push(action);
        }
        Ok(Self(names))
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.iter().any(|a| a == action)
    }

    /// Return the stored name equal to `action`, if configured.
    pub fn get(&self, action: &str) -> Option<&str> {
        self.0.iter().find(|a| *a == action).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for ActionSet {
    type Error = WarrantError;

    fn try_from(actions: Vec<String>) -> WarrantResult<Self> {
        Self::new(actions)
    }
}

impl From<ActionSet> for Vec<String> {
    fn from(set: ActionSet) -> Self {
        set.0
    }
}
