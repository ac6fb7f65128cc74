//! The access-control façade.
//!
//! `AccessControl` binds a fixed `ActionSet` to a `PolicySource`, an
//! `Evaluator`, and a `DiagnosticSink`. `can(subject)` yields a fresh
//! `Permissions` with one checker per configured action. Every check runs
//! the same pipeline:
//!
//!   Target → Policy Source → [empty? deny] → AuthContext → OR-fold → bool
//!
//! The pipeline is fail-closed: a failing or panicking policy source, a
//! context that cannot be built, or a failing or panicking evaluator all
//! produce `false` plus one diagnostic. Callers never see an error.

use std::{any::Any, marker::PhantomData, panic::AssertUnwindSafe};

use futures::FutureExt;
use serde::Serialize;
use tracing::debug;

use warrant_contracts::{
    condition::ConditionTree,
    context::{AuthContext, DynamicResource, Resource, Target},
    diagnostic::Diagnostic,
    error::{WarrantError, WarrantResult},
    policy::ActionSet,
};

use crate::{
    evaluator::TreeEvaluator,
    traits::{DiagnosticSink, Evaluator, PolicySource},
};

/// The decision façade for subjects of type `S` acting on resources of type `R`.
///
/// The bound configuration is read-only after construction, so one instance
/// can serve any number of concurrent checks.
pub struct AccessControl<S, R: ?Sized = DynamicResource> {
    actions: ActionSet,
    source: Box<dyn PolicySource<S>>,
    evaluator: Box<dyn Evaluator>,
    diagnostics: Box<dyn DiagnosticSink>,
    _resource: PhantomData<fn(&R)>,
}

impl<S, R> AccessControl<S, R>
where
    S: Serialize + Send + Sync,
    R: Resource + ?Sized,
{
    /// Create a façade using the default `TreeEvaluator`.
    pub fn new(
        actions: ActionSet,
        source: Box<dyn PolicySource<S>>,
        diagnostics: Box<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            actions,
            source,
            evaluator: Box::new(TreeEvaluator::default()),
            diagnostics,
            _resource: PhantomData,
        }
    }

    /// Replace the evaluator.
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    /// Bind `subject` and return its per-action checkers.
    ///
    /// A new `Permissions` is built on every call; nothing is shared between
    /// subjects except the read-only configuration.
    pub fn can(&self, subject: S) -> Permissions<'_, S, R> {
        Permissions {
            control: self,
            subject,
        }
    }

    async fn decide(&self, subject: &S, action: &str, target: Target<'_, R>) -> bool {
        let resource_type = target.resource_type();
        let requires_resource = target.requires_resource();

        debug!(
            action = %action,
            resource_type = %resource_type,
            requires_resource,
            "looking up policies"
        );

        // The call itself runs inside the guarded future: a source may panic
        // while building its future, not only while polling it.
        let lookup = AssertUnwindSafe(async {
            self.source
                .get_conditions(subject, resource_type, action, requires_resource)
                .await
        })
        .catch_unwind()
        .await;

        let trees = match lookup {
            Ok(Ok(trees)) => trees,
            Ok(Err(e)) => {
                self.report(Diagnostic::PolicySourceFailure {
                    resource_type: resource_type.to_string(),
                    action: action.to_string(),
                    error: e.to_string(),
                });
                return false;
            }
            Err(payload) => {
                self.report(Diagnostic::PolicySourceFailure {
                    resource_type: resource_type.to_string(),
                    action: action.to_string(),
                    error: format!("policy source panicked: {}", panic_message(payload)),
                });
                return false;
            }
        };

        if trees.is_empty() {
            self.report(Diagnostic::NoPolicyFound {
                resource_type: resource_type.to_string(),
                action: action.to_string(),
            });
            return false;
        }

        match self.evaluate_all(subject, target, &trees) {
            Ok(allowed) => allowed,
            Err(e) => {
                self.report(Diagnostic::EvaluationFailure {
                    resource_type: resource_type.to_string(),
                    action: action.to_string(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// OR-fold `trees` in order, stopping at the first grant.
    fn evaluate_all(
        &self,
        subject: &S,
        target: Target<'_, R>,
        trees: &[ConditionTree],
    ) -> WarrantResult<bool> {
        let ctx = AuthContext::for_target(subject, &target)?;

        for (index, tree) in trees.iter().enumerate() {
            let granted = std::panic::catch_unwind(AssertUnwindSafe(|| {
                self.evaluator.evaluate(tree, &ctx)
            }))
            .map_err(|payload| WarrantError::Evaluation {
                reason: format!(
                    "evaluator panicked on policy {index}: {}",
                    panic_message(payload)
                ),
            })??;

            if granted {
                debug!(policy_index = index, "policy granted access");
                return Ok(true);
            }
        }

        debug!(policy_count = trees.len(), "no policy granted access");
        Ok(false)
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.record(&diagnostic);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// The checkers bound to one subject.
///
/// Exposes exactly the configured actions. There is no way to add, remove,
/// or replace an action; asking for an unconfigured one yields `None`.
pub struct Permissions<'a, S, R: ?Sized = DynamicResource> {
    control: &'a AccessControl<S, R>,
    subject: S,
}

impl<'a, S, R> Permissions<'a, S, R>
where
    S: Serialize + Send + Sync,
    R: Resource + ?Sized,
{
    pub fn subject(&self) -> &S {
        &self.subject
    }

    /// Configured action names, in configuration order.
    pub fn actions(&self) -> impl Iterator<Item = &'a str> {
        self.control.actions.iter()
    }

    /// The checker for `action`, or `None` if it is not configured.
    pub fn action(&self, action: &str) -> Option<ActionChecker<'_, S, R>> {
        let action = self.control.actions.get(action)?;
        Some(ActionChecker {
            control: self.control,
            subject: &self.subject,
            action,
        })
    }

    /// All checkers, in configuration order.
    pub fn checkers(&self) -> impl Iterator<Item = ActionChecker<'_, S, R>> {
        self.control.actions.iter().map(move |action| ActionChecker {
            control: self.control,
            subject: &self.subject,
            action,
        })
    }
}

/// Decides one action for one subject.
pub struct ActionChecker<'p, S, R: ?Sized = DynamicResource> {
    control: &'p AccessControl<S, R>,
    subject: &'p S,
    action: &'p str,
}

impl<'p, S, R> ActionChecker<'p, S, R>
where
    S: Serialize + Send + Sync,
    R: Resource + ?Sized,
{
    pub fn action(&self) -> &'p str {
        self.action
    }

    /// Decide the action for `target`.
    ///
    /// Returns `true` only when some policy returned by the source grants
    /// access. Every failure path returns `false` and records a diagnostic.
    pub async fn check(&self, target: Target<'_, R>) -> bool {
        self.control.decide(self.subject, self.action, target).await
    }

    /// Decide the action on a concrete resource instance.
    pub async fn resource(&self, resource: &R) -> bool {
        self.check(Target::Instance(resource)).await
    }

    /// Decide the action on a bare resource type, with no instance in context.
    pub async fn resource_type(&self, resource_type: &str) -> bool {
        self.check(Target::Type(resource_type)).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
