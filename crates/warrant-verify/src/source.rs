//! A policy source wrapper that refuses to hand out invalid trees.

use async_trait::async_trait;
use tracing::warn;

use warrant_contracts::{
    condition::ConditionTree,
    error::{WarrantError, WarrantResult},
    validation::ValidationReport,
};
use warrant_core::traits::PolicySource;

use crate::engine::PolicyValidator;

/// Wraps any `PolicySource` and validates every tree it returns.
///
/// A lookup that yields even one invalid tree fails as a whole with
/// `WarrantError::InvalidPolicy`, which the façade reports as a policy
/// source failure and turns into a deny.
pub struct ValidatingPolicySource<P> {
    inner: P,
    validator: PolicyValidator,
}

impl<P> ValidatingPolicySource<P> {
    pub fn new(inner: P, validator: PolicyValidator) -> Self {
        Self { inner, validator }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn validator(&self) -> &PolicyValidator {
        &self.validator
    }
}

#[async_trait]
impl<S, P> PolicySource<S> for ValidatingPolicySource<P>
where
    S: ?Sized + Sync,
    P: PolicySource<S>,
{
    async fn get_conditions(
        &self,
        subject: &S,
        resource_type: &str,
        action: &str,
        requires_resource: bool,
    ) -> WarrantResult<Vec<ConditionTree>> {
        let trees = self
            .inner
            .get_conditions(subject, resource_type, action, requires_resource)
            .await?;

        let mut report = ValidationReport::from_failures(vec![]);
        for tree in &trees {
            report.merge(self.validator.validate_tree(tree, requires_resource));
        }

        if !report.passed {
            warn!(
                resource_type = %resource_type,
                action = %action,
                failure_count = report.failures.len(),
                "policy source returned invalid condition trees"
            );
            return Err(WarrantError::InvalidPolicy {
                reason: report.summary(),
            });
        }
        Ok(trees)
    }
}
