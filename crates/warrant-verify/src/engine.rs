//! Load-time validator for condition trees.
//!
//! `PolicyValidator` checks a policy before it ever reaches the evaluator.
//! Validation runs in two phases:
//!
//! 1. **Structural**: the raw policy JSON is validated against a built-in,
//!    recursive JSON Schema describing the condition-tree wire shape.
//! 2. **Semantic**: every leaf is checked for a correctly rooted `left`
//!    path and a known operator, the tree depth is bounded, and, when a
//!    context schema is configured, every path operand must resolve through
//!    that schema's `properties`.
//!
//! All failures are collected before returning so an operator sees the full
//! set in one pass.

use serde_json::{json, Value};
use tracing::{debug, warn};

use warrant_contracts::{
    condition::{ConditionTree, Leaf, RESOURCE_PREFIX, SUBJECT_PREFIX},
    context::AuthContext,
    error::{WarrantError, WarrantResult},
    policy::{Entitlement, Policy},
    validation::{ValidationFailure, ValidationReport},
};
use warrant_core::evaluator::DEFAULT_MAX_DEPTH;

pub const RULE_JSON_SCHEMA: &str = "json-schema";
pub const RULE_LEFT_PATH_ROOT: &str = "left-path-root";
pub const RULE_UNKNOWN_OPERATOR: &str = "unknown-operator";
pub const RULE_MAX_DEPTH: &str = "max-depth";
pub const RULE_UNKNOWN_PATH: &str = "unknown-path";
pub const RULE_CONTEXT_SCHEMA: &str = "context-schema";

/// Bound on `$ref` and combinator hops while walking a context schema.
const MAX_SCHEMA_HOPS: usize = 64;

/// The JSON Schema every serialized condition tree must satisfy.
pub fn condition_tree_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$ref": "#/$defs/tree",
        "$defs": {
            "tree": {
                "oneOf": [
                    { "$ref": "#/$defs/group" },
                    { "$ref": "#/$defs/leaf" }
                ]
            },
            "group": {
                "type": "object",
                "required": ["join", "conditions"],
                "properties": {
                    "join": { "enum": ["and", "or"] },
                    "conditions": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/tree" }
                    }
                }
            },
            "leaf": {
                "type": "object",
                "required": ["left", "op", "right"],
                "properties": {
                    "left": { "type": "string", "minLength": 1 },
                    "op": { "type": "string" }
                }
            }
        }
    })
}

struct ContextSchema {
    document: Value,
    validator: jsonschema::Validator,
}

/// Validates condition trees, policies and whole entitlement lists.
///
/// ```rust,ignore
/// let validator = PolicyValidator::new().with_context_schema(schema)?;
/// let report = validator.validate_entitlements(source.entitlements());
/// if !report.passed {
///     eprintln!("{}", report.summary());
/// }
/// ```
pub struct PolicyValidator {
    tree_schema: Result<jsonschema::Validator, String>,
    context: Option<ContextSchema>,
    max_depth: usize,
}

impl PolicyValidator {
    /// A validator with no context schema and the default depth bound.
    pub fn new() -> Self {
        Self {
            tree_schema: jsonschema::validator_for(&condition_tree_schema())
                .map_err(|e| e.to_string()),
            context: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Check path operands against `schema`, a JSON Schema describing the
    /// `{ "subject": ..., "resource": ... }` evaluation context.
    ///
    /// Returns `WarrantError::Config` if `schema` is not a valid JSON Schema.
    pub fn with_context_schema(mut self, schema: Value) -> WarrantResult<Self> {
        let validator = jsonschema::validator_for(&schema).map_err(|e| WarrantError::Config {
            reason: format!("invalid context schema: {e}"),
        })?;
        self.context = Some(ContextSchema {
            document: schema,
            validator,
        });
        Ok(self)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn has_context_schema(&self) -> bool {
        self.context.is_some()
    }

    // ── Entry points ──────────────────────────────────────────────────────────

    /// Validate a raw JSON condition tree.
    ///
    /// `requires_resource` states whether the owning policy is evaluated with
    /// a resource instance; it decides whether `resource.` paths are legal.
    pub fn validate_document(&self, document: &Value, requires_resource: bool) -> ValidationReport {
        let structural = self.validate_structure(document);
        if !structural.passed {
            return structural;
        }

        match serde_json::from_value::<ConditionTree>(document.clone()) {
            Ok(tree) => self.validate_tree(&tree, requires_resource),
            Err(e) => ValidationReport::from_failures(vec![ValidationFailure::new(
                RULE_JSON_SCHEMA,
                format!("document is not a condition tree: {e}"),
            )]),
        }
    }

    /// Run both phases over an already-parsed tree.
    ///
    /// A tree nested past `max_depth` skips the structural phase, which
    /// would have to serialize it recursively.
    pub fn validate_tree(&self, tree: &ConditionTree, requires_resource: bool) -> ValidationReport {
        let mut report = if tree.exceeds_depth(self.max_depth) {
            ValidationReport::from_failures(vec![])
        } else {
            match serde_json::to_value(tree) {
                Ok(document) => self.validate_structure(&document),
                Err(e) => ValidationReport::from_failures(vec![ValidationFailure::new(
                    RULE_JSON_SCHEMA,
                    format!("condition tree could not be serialized: {e}"),
                )]),
            }
        };
        report.merge(self.validate_semantics(tree, requires_resource));

        debug!(
            passed = report.passed,
            failure_count = report.failures.len(),
            "condition tree validated"
        );
        report
    }

    pub fn validate_policy(&self, policy: &Policy) -> ValidationReport {
        self.validate_tree(&policy.conditions, policy.requires_resource)
    }

    /// Validate every policy of every entitlement. Messages are prefixed
    /// with the entitlement id and action they belong to.
    pub fn validate_entitlements(&self, entitlements: &[Entitlement]) -> ValidationReport {
        let mut failures = Vec::new();
        for entitlement in entitlements {
            for (action, policy) in &entitlement.policies {
                let report = self.validate_policy(policy);
                failures.extend(report.failures.into_iter().map(|f| {
                    ValidationFailure::new(
                        f.rule_id,
                        format!("entitlement {} '{}': {}", entitlement.id, action, f.message),
                    )
                }));
            }
        }
        ValidationReport::from_failures(failures)
    }

    /// Validate a built evaluation context against the context schema.
    /// Passes trivially when no context schema is configured.
    pub fn validate_context(&self, ctx: &AuthContext) -> ValidationReport {
        let Some(context) = &self.context else {
            return ValidationReport::from_failures(vec![]);
        };
        let instance = match serde_json::to_value(ctx) {
            Ok(v) => v,
            Err(e) => {
                return ValidationReport::from_failures(vec![ValidationFailure::new(
                    RULE_CONTEXT_SCHEMA,
                    format!("context could not be serialized: {e}"),
                )])
            }
        };
        let failures = context
            .validator
            .iter_errors(&instance)
            .map(|error| {
                let message = format!("context violation at {}: {}", error.instance_path, error);
                warn!(%message, "context schema failure");
                ValidationFailure::new(RULE_CONTEXT_SCHEMA, message)
            })
            .collect();
        ValidationReport::from_failures(failures)
    }

    // ── Phase 1: structure ────────────────────────────────────────────────────

    fn validate_structure(&self, document: &Value) -> ValidationReport {
        let validator = match &self.tree_schema {
            Ok(validator) => validator,
            Err(e) => {
                let message = format!("invalid condition tree schema: {e}");
                warn!(%message, "schema compilation failure");
                return ValidationReport::from_failures(vec![ValidationFailure::new(
                    RULE_JSON_SCHEMA,
                    message,
                )]);
            }
        };

        let failures = validator
            .iter_errors(document)
            .map(|error| {
                let message = format!(
                    "JSON Schema violation at {}: {}",
                    error.instance_path, error
                );
                warn!(%message, "structural validation failure");
                ValidationFailure::new(RULE_JSON_SCHEMA, message)
            })
            .collect();
        ValidationReport::from_failures(failures)
    }

    // ── Phase 2: semantics ────────────────────────────────────────────────────

    fn validate_semantics(&self, tree: &ConditionTree, requires_resource: bool) -> ValidationReport {
        let mut failures = Vec::new();

        let depth = tree.depth();
        if depth > self.max_depth {
            failures.push(ValidationFailure::new(
                RULE_MAX_DEPTH,
                format!("nesting depth {depth} exceeds the maximum of {}", self.max_depth),
            ));
        }

        for (location, leaf) in collect_leaves(tree) {
            self.check_leaf(&location, leaf, requires_resource, &mut failures);
        }

        for failure in &failures {
            warn!(rule_id = %failure.rule_id, message = %failure.message, "semantic rule failed");
        }
        ValidationReport::from_failures(failures)
    }

    fn check_leaf(
        &self,
        location: &str,
        leaf: &Leaf,
        requires_resource: bool,
        failures: &mut Vec<ValidationFailure>,
    ) {
        let rooted = leaf.left.starts_with(SUBJECT_PREFIX)
            || (requires_resource && leaf.left.starts_with(RESOURCE_PREFIX));
        if !rooted {
            let allowed = if requires_resource {
                format!("'{SUBJECT_PREFIX}' or '{RESOURCE_PREFIX}'")
            } else {
                format!("'{SUBJECT_PREFIX}' (the policy has no resource)")
            };
            failures.push(ValidationFailure::new(
                RULE_LEFT_PATH_ROOT,
                format!("{location}: left path '{}' must start with {allowed}", leaf.left),
            ));
        }

        if !leaf.op.is_known() {
            failures.push(ValidationFailure::new(
                RULE_UNKNOWN_OPERATOR,
                format!("{location}: unknown operator '{}'", leaf.op),
            ));
        }

        let Some(context) = &self.context else {
            return;
        };
        let mut paths = Vec::with_capacity(2);
        if rooted {
            paths.push(leaf.left.as_str());
        }
        if let Some(right) = leaf.right_path(requires_resource) {
            paths.push(right);
        }
        for path in paths {
            let segments: Vec<&str> = path.split('.').collect();
            if !schema_resolves(&context.document, &context.document, &segments, 0) {
                failures.push(ValidationFailure::new(
                    RULE_UNKNOWN_PATH,
                    format!("{location}: path '{path}' is not declared by the context schema"),
                ));
            }
        }
    }
}

impl Default for PolicyValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Every leaf with its location, in document order.
fn collect_leaves(tree: &ConditionTree) -> Vec<(String, &Leaf)> {
    let mut leaves = Vec::new();
    let mut stack = vec![(tree, "$".to_string())];
    while let Some((node, location)) = stack.pop() {
        match node {
            ConditionTree::Leaf(leaf) => leaves.push((location, leaf)),
            ConditionTree::Group(group) => {
                for (idx, child) in group.conditions.iter().enumerate().rev() {
                    stack.push((child, format!("{location}.conditions[{idx}]")));
                }
            }
        }
    }
    leaves
}

/// Whether `segments` can be walked through `node`'s `properties`, following
/// local `$ref`s and `oneOf` / `anyOf` / `allOf` branches.
fn schema_resolves(root: &Value, node: &Value, segments: &[&str], hops: usize) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return true;
    };
    if hops > MAX_SCHEMA_HOPS {
        return false;
    }

    if let Some(target) = node
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|r| r.strip_prefix('#'))
        .and_then(|pointer| root.pointer(pointer))
    {
        if schema_resolves(root, target, segments, hops + 1) {
            return true;
        }
    }

    if let Some(child) = node.get("properties").and_then(|p| p.get(*head)) {
        if schema_resolves(root, child, rest, hops) {
            return true;
        }
    }

    ["oneOf", "anyOf", "allOf"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_array))
        .flatten()
        .any(|branch| schema_resolves(root, branch, segments, hops + 1))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use warrant_contracts::{
        condition::{ConditionTree, Operator},
        context::AuthContext,
        policy::Policy,
    };

    use super::*;

    // ── Builder helpers ───────────────────────────────────────────────────────

    fn context_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "subject": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer" },
                        "role": { "type": "string" },
                        "team": { "$ref": "#/$defs/team" }
                    },
                    "required": ["id"]
                },
                "resource": {
                    "oneOf": [
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "doc" },
                                "owner_id": { "type": "integer" }
                            }
                        },
                        {
                            "type": "object",
                            "properties": {
                                "type": { "const": "folder" },
                                "members": { "type": "array" }
                            }
                        }
                    ]
                }
            },
            "$defs": {
                "team": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                }
            }
        })
    }

    fn rule_ids(report: &ValidationReport) -> Vec<&str> {
        report.failures.iter().map(|f| f.rule_id.as_str()).collect()
    }

    // ── Structural phase ──────────────────────────────────────────────────────

    #[test]
    fn test_well_formed_document_passes() {
        let validator = PolicyValidator::new();
        let document = json!({
            "join": "or",
            "conditions": [
                { "left": "subject.role", "op": "eq", "right": "admin" },
                { "left": "subject.id", "op": "eq", "right": "resource.owner_id" }
            ]
        });

        let report = validator.validate_document(&document, true);
        assert!(report.passed, "expected pass, failures: {:?}", report.failures);
    }

    #[test]
    fn test_malformed_document_fails_structurally() {
        let validator = PolicyValidator::new();

        for document in [
            json!({ "join": "xor", "conditions": [] }),
            json!({ "left": "subject.id", "op": "eq" }),
            json!({ "join": "and", "conditions": [{ "left": 3, "op": "eq", "right": 1 }] }),
            json!("subject.id == 1"),
        ] {
            let report = validator.validate_document(&document, false);
            assert!(!report.passed, "expected failure for {document}");
            assert!(
                rule_ids(&report).iter().all(|id| *id == RULE_JSON_SCHEMA),
                "structural failures only: {:?}",
                report.failures
            );
        }
    }

    // ── Semantic phase ────────────────────────────────────────────────────────

    #[test]
    fn test_left_path_root() {
        let validator = PolicyValidator::new();

        let stray = ConditionTree::leaf("user.id", Operator::Eq, 1);
        assert_eq!(rule_ids(&validator.validate_tree(&stray, true)), vec![RULE_LEFT_PATH_ROOT]);

        let needs_resource = ConditionTree::leaf("resource.owner_id", Operator::Eq, 1);
        assert!(validator.validate_tree(&needs_resource, true).passed);

        let report = validator.validate_tree(&needs_resource, false);
        assert_eq!(rule_ids(&report), vec![RULE_LEFT_PATH_ROOT]);
        assert!(report.failures[0].message.contains("has no resource"));
    }

    #[test]
    fn test_unknown_operator_is_reported_with_location() {
        let validator = PolicyValidator::new();
        let tree = ConditionTree::all(vec![
            ConditionTree::leaf("subject.id", Operator::Eq, 1),
            ConditionTree::leaf("subject.id", Operator::Unknown("like".to_string()), 1),
        ]);

        let report = validator.validate_tree(&tree, false);
        assert_eq!(rule_ids(&report), vec![RULE_UNKNOWN_OPERATOR]);
        assert!(
            report.failures[0].message.starts_with("$.conditions[1]"),
            "message should locate the leaf: {}",
            report.failures[0].message
        );
    }

    #[test]
    fn test_max_depth() {
        let mut tree = ConditionTree::leaf("subject.id", Operator::Eq, 1);
        for _ in 0..4 {
            tree = ConditionTree::any(vec![tree]);
        }

        assert!(PolicyValidator::new().with_max_depth(5).validate_tree(&tree, false).passed);

        let report = PolicyValidator::new().with_max_depth(4).validate_tree(&tree, false);
        assert_eq!(rule_ids(&report), vec![RULE_MAX_DEPTH]);
    }

    #[test]
    fn test_very_deep_tree_reports_max_depth() {
        let mut tree = ConditionTree::leaf("user.id", Operator::Eq, 1);
        for _ in 0..100_000 {
            tree = ConditionTree::all(vec![tree]);
        }

        let report = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || PolicyValidator::new().validate_tree(&tree, false))
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(rule_ids(&report), vec![RULE_MAX_DEPTH, RULE_LEFT_PATH_ROOT]);
        assert!(report.failures[0].message.contains("100001"), "got: {}", report.failures[0].message);
    }

    #[test]
    fn test_all_failures_are_collected() {
        let validator = PolicyValidator::new().with_max_depth(1);
        let tree = ConditionTree::all(vec![
            ConditionTree::leaf("user.id", Operator::Eq, 1),
            ConditionTree::leaf("subject.id", Operator::Unknown("~".to_string()), 1),
        ]);

        let report = validator.validate_tree(&tree, false);
        assert!(!report.passed);
        assert_eq!(
            rule_ids(&report),
            vec![RULE_MAX_DEPTH, RULE_LEFT_PATH_ROOT, RULE_UNKNOWN_OPERATOR]
        );
    }

    // ── Context schema ────────────────────────────────────────────────────────

    #[test]
    fn test_paths_resolve_through_context_schema() {
        let validator = PolicyValidator::new()
            .with_context_schema(context_schema())
            .unwrap();
        let tree = ConditionTree::any(vec![
            ConditionTree::leaf("subject.id", Operator::Eq, "resource.owner_id"),
            ConditionTree::leaf("subject.team.name", Operator::Eq, "ops"),
            ConditionTree::leaf("resource.members", Operator::Neq, json!(null)),
        ]);

        let report = validator.validate_tree(&tree, true);
        assert!(report.passed, "expected pass, failures: {:?}", report.failures);
    }

    #[test]
    fn test_undeclared_paths_are_reported() {
        let validator = PolicyValidator::new()
            .with_context_schema(context_schema())
            .unwrap();
        let tree = ConditionTree::all(vec![
            ConditionTree::leaf("subject.email", Operator::Eq, "a@b.c"),
            ConditionTree::leaf("subject.id", Operator::Eq, "resource.creator_id"),
        ]);

        let report = validator.validate_tree(&tree, true);
        assert_eq!(rule_ids(&report), vec![RULE_UNKNOWN_PATH, RULE_UNKNOWN_PATH]);
        assert!(report.failures[0].message.contains("subject.email"));
        assert!(report.failures[1].message.contains("resource.creator_id"));
    }

    #[test]
    fn test_literal_right_operand_is_not_a_path() {
        let validator = PolicyValidator::new()
            .with_context_schema(context_schema())
            .unwrap();
        // Without a resource, "resource.x" on the right is a plain string.
        let tree = ConditionTree::leaf("subject.role", Operator::Eq, "resource.x");

        assert!(validator.validate_tree(&tree, false).passed);
    }

    #[test]
    fn test_invalid_context_schema_is_config_error() {
        let result = PolicyValidator::new().with_context_schema(json!({ "type": 12 }));
        assert!(matches!(result, Err(WarrantError::Config { .. })));
    }

    #[test]
    fn test_validate_context() {
        let validator = PolicyValidator::new()
            .with_context_schema(context_schema())
            .unwrap();

        let good = AuthContext::from_values(json!({ "id": 1 }), Some(json!({ "type": "doc", "owner_id": 2 })));
        assert!(validator.validate_context(&good).passed);

        let bad = AuthContext::from_values(json!({ "role": "admin" }), None);
        let report = validator.validate_context(&bad);
        assert_eq!(rule_ids(&report), vec![RULE_CONTEXT_SCHEMA]);

        assert!(PolicyValidator::new().validate_context(&bad).passed);
    }

    // ── Entitlements ──────────────────────────────────────────────────────────

    #[test]
    fn test_entitlement_failures_name_their_origin() {
        let mut policies = std::collections::BTreeMap::new();
        policies.insert(
            "read".to_string(),
            Policy {
                requires_resource: false,
                conditions: ConditionTree::leaf("resource.owner_id", Operator::Eq, 1),
            },
        );
        let entitlement = Entitlement {
            id: 7,
            title: "Broken".to_string(),
            description: String::new(),
            resource_type: "doc".to_string(),
            policies,
        };

        let report = PolicyValidator::new().validate_entitlements(&[entitlement]);
        assert_eq!(report.failures.len(), 1);
        assert!(
            report.failures[0].message.starts_with("entitlement 7 'read': "),
            "got: {}",
            report.failures[0].message
        );
    }
}
