//! TOML-backed policy source.
//!
//! `TomlPolicySource` loads a `PolicyConfig` from a TOML string or file and
//! implements the `PolicySource` trait from warrant-core.
//!
//! Lookup algorithm for `(resource_type, action, requires_resource)`:
//!
//! 1. Walk entitlements in declaration order.
//! 2. Skip entitlements for another resource type, and those without a
//!    policy for `action`.
//! 3. For a bare resource-type request, skip policies that require a
//!    resource instance; an instance request accepts both kinds.
//! 4. Return the surviving condition trees in that order.
//!
//! The subject is not consulted: subject-specific logic belongs in the
//! condition trees themselves.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use warrant_contracts::{
    condition::ConditionTree,
    error::{WarrantError, WarrantResult},
    policy::{ActionSet, Entitlement},
};
use warrant_core::{evaluator::TreeEvaluator, traits::PolicySource};

use crate::rule::PolicyConfig;

/// A `PolicySource` implementation that serves entitlements read from TOML.
///
/// ```rust,ignore
/// use warrant_policy::TomlPolicySource;
///
/// let source = TomlPolicySource::from_file(Path::new("policies/documents.toml"))?;
/// let control = AccessControl::new(source.action_set().clone(), Box::new(source), sink);
/// ```
#[derive(Debug, Clone)]
pub struct TomlPolicySource {
    config: PolicyConfig,
}

impl TomlPolicySource {
    /// Build a source from an already-parsed configuration.
    ///
    /// Returns `WarrantError::Config` if the configuration fails
    /// `PolicyConfig::validate`.
    pub fn new(config: PolicyConfig) -> WarrantResult<Self> {
        config.validate()?;
        info!(
            actions = config.actions.len(),
            entitlements = config.entitlements.len(),
            "policy configuration loaded"
        );
        Ok(Self { config })
    }

    /// Parse `s` as TOML and build a `TomlPolicySource`.
    ///
    /// Returns `WarrantError::Config` if the TOML is malformed, does not match
    /// the `PolicyConfig` schema, or fails validation.
    pub fn from_toml_str(s: &str) -> WarrantResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| WarrantError::Config {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        Self::new(config)
    }

    /// Read the file at `path` and parse it as TOML policy configuration.
    pub fn from_file(path: &Path) -> WarrantResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WarrantError::Config {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn action_set(&self) -> &ActionSet {
        &self.config.actions
    }

    pub fn entitlements(&self) -> &[Entitlement] {
        &self.config.entitlements
    }

    /// An evaluator honoring the configured `max_depth`.
    pub fn evaluator(&self) -> TreeEvaluator {
        TreeEvaluator::new(self.config.max_depth)
    }

    /// The condition trees applying to one request, in declaration order.
    pub fn policies_for(
        &self,
        resource_type: &str,
        action: &str,
        requires_resource: bool,
    ) -> Vec<ConditionTree> {
        self.config
            .entitlements
            .iter()
            .filter(|e| e.resource_type == resource_type)
            .filter_map(|e| e.policy_for(action).map(|policy| (e, policy)))
            .filter(|(_, policy)| requires_resource || !policy.requires_resource)
            .map(|(entitlement, policy)| {
                debug!(
                    entitlement_id = entitlement.id,
                    entitlement = %entitlement.title,
                    action = %action,
                    "policy applies"
                );
                policy.conditions.clone()
            })
            .collect()
    }
}

#[async_trait]
impl<S: ?Sized + Sync> PolicySource<S> for TomlPolicySource {
    async fn get_conditions(
        &self,
        _subject: &S,
        resource_type: &str,
        action: &str,
        requires_resource: bool,
    ) -> WarrantResult<Vec<ConditionTree>> {
        Ok(self.policies_for(resource_type, action, requires_resource))
    }
}
