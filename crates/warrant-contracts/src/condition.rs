//! Condition trees: the boolean expressions a policy is made of.
//!
//! A tree is either a `Leaf` comparing two operands or a `Group` joining an
//! ordered list of subtrees with `and` / `or`. The wire shape is untagged:
//!
//! ```json
//! { "join": "or", "conditions": [
//!     { "left": "subject.id", "op": "eq", "right": "resource.owner_id" },
//!     { "left": "subject.role", "op": "eq", "right": "admin" }
//! ] }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path prefix addressing the subject in an evaluation context.
pub const SUBJECT_PREFIX: &str = "subject.";

/// Path prefix addressing the resource in an evaluation context.
pub const RESOURCE_PREFIX: &str = "resource.";

/// A boolean expression over an `AuthContext`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionTree {
    Group(Group),
    Leaf(Leaf),
}

impl ConditionTree {
    /// Build a leaf comparing the value at `left` against `right`.
    pub fn leaf(left: impl Into<String>, op: Operator, right: impl Into<Value>) -> Self {
        Self::Leaf(Leaf {
            left: left.into(),
            op,
            right: right.into(),
        })
    }

    /// Build an `and` group. An empty group is vacuously true.
    pub fn all(conditions: Vec<ConditionTree>) -> Self {
        Self::Group(Group {
            join: Join::And,
            conditions,
        })
    }

    /// Build an `or` group. An empty group is vacuously false.
    pub fn any(conditions: Vec<ConditionTree>) -> Self {
        Self::Group(Group {
            join: Join::Or,
            conditions,
        })
    }

    /// Nesting depth of the tree. A single leaf has depth 1.
    ///
    /// Walks with an explicit stack, so arbitrarily deep trees are measured
    /// without recursion.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((tree, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Self::Group(group) = tree {
                stack.extend(group.conditions.iter().map(|child| (child, level + 1)));
            }
        }
        deepest
    }

    /// Whether the tree nests deeper than `max_depth`.
    ///
    /// Stops at the first node past the bound instead of measuring the
    /// whole tree.
    pub fn exceeds_depth(&self, max_depth: usize) -> bool {
        let mut stack = vec![(self, 1usize)];
        while let Some((tree, level)) = stack.pop() {
            if level > max_depth {
                return true;
            }
            if let Self::Group(group) = tree {
                stack.extend(group.conditions.iter().map(|child| (child, level + 1)));
            }
        }
        false
    }
}

/// An ordered list of subtrees combined with one logical connective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub join: Join,
    pub conditions: Vec<ConditionTree>,
}

// Nested groups are flattened onto a heap stack before they drop, so a deep
// chain does not recurse once per level.
impl Drop for Group {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.conditions);
        while let Some(tree) = pending.pop() {
            if let ConditionTree::Group(mut group) = tree {
                pending.append(&mut group.conditions);
            }
        }
    }
}

/// A single comparison.
///
/// `left` is always a dot-path. `right` is a dot-path only when it is a
/// string starting with `subject.`, or with `resource.` while the context
/// carries a resource; otherwise it is compared as a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub left: String,
    pub op: Operator,
    pub right: Value,
}

impl Leaf {
    /// Return the path held in `right` if it would be resolved as a path in
    /// a context whose resource presence is `has_resource`.
    pub fn right_path(&self, has_resource: bool) -> Option<&str> {
        let s = self.right.as_str()?;
        if s.starts_with(SUBJECT_PREFIX) || (has_resource && s.starts_with(RESOURCE_PREFIX)) {
            Some(s)
        } else {
            None
        }
    }
}

/// The logical connective of a `Group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Join {
    And,
    Or,
}

/// Comparison operator of a `Leaf`.
///
/// Unrecognised operator names are kept as `Unknown` rather than failing
/// deserialisation; they evaluate to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            _ => Self::Unknown(name),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
