//! The condition-tree evaluator.
//!
//! Evaluation is a pure recursive walk:
//!
//! 1. A `Group` folds its children in order with `and` / `or`, short-circuiting.
//!    An empty `and` is true, an empty `or` is false.
//! 2. A `Leaf` resolves `left` as a dot-path into the context, resolves `right`
//!    as a path or keeps it as a literal, coerces the pair, then compares.
//!
//! Coercion of a resolved pair `(l, r)`:
//!
//! - both convert to finite numbers → numeric comparison;
//! - otherwise, either is a boolean → both converted to booleans;
//! - otherwise → the values are compared as they are. Ordering of such pairs
//!   is defined only for two strings (Unicode code-point order); every other
//!   uncoerced ordering is false.
//!
//! A path that cannot be resolved yields an undefined operand rather than an
//! error, and an unknown operator evaluates to false. `evaluate` is total.

use std::cmp::Ordering;

use serde_json::Value;

use warrant_contracts::{
    condition::{ConditionTree, Join, Leaf, Operator},
    context::AuthContext,
    error::{WarrantError, WarrantResult},
};

use crate::traits::Evaluator;

/// Default bound on group nesting enforced by `TreeEvaluator`.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Evaluate `tree` against `ctx`.
pub fn evaluate(tree: &ConditionTree, ctx: &AuthContext) -> bool {
    match tree {
        ConditionTree::Group(group) => match group.join {
            Join::And => group.conditions.iter().all(|c| evaluate(c, ctx)),
            Join::Or => group.conditions.iter().any(|c| evaluate(c, ctx)),
        },
        ConditionTree::Leaf(leaf) => evaluate_leaf(leaf, ctx),
    }
}

/// Evaluate `tree` against `ctx`, refusing trees nested deeper than `max_depth`.
pub fn try_evaluate(tree: &ConditionTree, ctx: &AuthContext, max_depth: usize) -> WarrantResult<bool> {
    if tree.exceeds_depth(max_depth) {
        return Err(WarrantError::NestingTooDeep { max_depth });
    }
    Ok(evaluate(tree, ctx))
}

/// Resolve a dot-path such as `subject.profile.age` against the context.
///
/// Returns `None` (the undefined operand) when the root is not `subject` or
/// a present `resource`, when a segment is missing, or when an intermediate
/// value is not a JSON object. Arrays are not traversed.
pub fn resolve_path<'c>(ctx: &'c AuthContext, path: &str) -> Option<&'c Value> {
    let mut segments = path.split('.');
    let mut current = ctx.root(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn evaluate_leaf(leaf: &Leaf, ctx: &AuthContext) -> bool {
    let left = resolve_path(ctx, &leaf.left);
    let right = match leaf.right_path(ctx.has_resource()) {
        Some(path) => resolve_path(ctx, path),
        None => Some(&leaf.right),
    };
    compare(&leaf.op, coerce(left, right))
}

// ── Coercion ──────────────────────────────────────────────────────────────────

/// A resolved operand pair after coercion.
#[derive(Debug, PartialEq)]
enum Coerced<'v> {
    Number(f64, f64),
    Boolean(bool, bool),
    Raw(Option<&'v Value>, Option<&'v Value>),
}

fn coerce<'v>(left: Option<&'v Value>, right: Option<&'v Value>) -> Coerced<'v> {
    if let (Some(l), Some(r)) = (to_number(left), to_number(right)) {
        return Coerced::Number(l, r);
    }
    if is_boolean(left) || is_boolean(right) {
        return Coerced::Boolean(to_boolean(left), to_boolean(right));
    }
    Coerced::Raw(left, right)
}

fn compare(op: &Operator, coerced: Coerced<'_>) -> bool {
    let (equal, ordering) = match coerced {
        Coerced::Number(l, r) => (l == r, l.partial_cmp(&r)),
        Coerced::Boolean(l, r) => (l == r, Some(l.cmp(&r))),
        Coerced::Raw(l, r) => (l == r, raw_ordering(l, r)),
    };

    match op {
        Operator::Eq => equal,
        Operator::Neq => !equal,
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Unknown(_) => false,
    }
}

fn raw_ordering(left: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    match (left, right) {
        (Some(Value::String(l)), Some(Value::String(r))) => Some(l.as_str().cmp(r.as_str())),
        _ => None,
    }
}

fn is_boolean(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(_)))
}

fn to_boolean(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Numeric conversion of an operand; `None` when it is not a finite number.
fn to_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_numeric(s)?,
        Value::Array(items) => parse_numeric(&join_array(items)?)?,
        Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// The comma-joined string form of an array, or `None` when an element is
/// an object (whose string form is never numeric).
fn join_array(items: &[Value]) -> Option<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(match item {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(inner) => join_array(inner)?,
            Value::Object(_) => return None,
        });
    }
    Some(parts.join(","))
}

fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim_matches(is_numeric_whitespace);
    if trimmed.is_empty() {
        return Some(0.0);
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() {
                return None;
            }
            return digits.chars().try_fold(0.0_f64, |acc, c| {
                c.to_digit(radix)
                    .map(|d| acc * f64::from(radix) + f64::from(d))
            });
        }
    }

    if is_decimal_literal(trimmed) {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

fn is_numeric_whitespace(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

// ── TreeEvaluator ─────────────────────────────────────────────────────────────

/// The default `Evaluator`: the tree walker above behind a nesting bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEvaluator {
    max_depth: usize,
}

impl TreeEvaluator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for TreeEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Evaluator for TreeEvaluator {
    fn evaluate(&self, tree: &ConditionTree, ctx: &AuthContext) -> WarrantResult<bool> {
        try_evaluate(tree, ctx, self.max_depth)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
