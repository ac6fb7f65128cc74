//! Resources, request targets, and the evaluation context.
//!
//! Subjects are any `Serialize` value. Resources additionally expose their
//! `type` discriminant through the `Resource` trait. A closed resource map is
//! best written as an internally tagged enum:
//!
//! ```rust,ignore
//! #[derive(Serialize)]
//! #[serde(tag = "type", rename_all = "lowercase")]
//! enum Asset {
//!     Doc { owner_id: u64 },
//!     Folder { shared: bool },
//! }
//!
//! impl Resource for Asset {
//!     fn resource_type(&self) -> &str {
//!         match self {
//!             Asset::Doc { .. } => "doc",
//!             Asset::Folder { .. } => "folder",
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{WarrantError, WarrantResult};

/// A resource that can be acted on.
///
/// The serialized form must carry the discriminant under the `type` key so
/// conditions can address it as `resource.type`.
pub trait Resource: Serialize + Send + Sync {
    /// The discriminant naming this resource's variant.
    fn resource_type(&self) -> &str;
}

/// An open-ended resource: a `type` plus arbitrary attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl DynamicResource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: Map::new(),
        }
    }

    /// Add one attribute, builder style.
    ///
    /// The `type` key is reserved for the discriminant and is ignored here;
    /// it would otherwise serialize twice and shadow `resource_type`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Parse a JSON object carrying a string `type` field.
    pub fn from_value(value: Value) -> WarrantResult<Self> {
        serde_json::from_value(value).map_err(|e| WarrantError::Context {
            reason: format!("resource must be an object with a string 'type': {e}"),
        })
    }
}

impl Resource for DynamicResource {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

/// What an action checker is asked about: a concrete resource instance, or
/// only a resource type.
#[derive(Debug)]
pub enum Target<'a, R: ?Sized> {
    Instance(&'a R),
    Type(&'a str),
}

impl<R: ?Sized> Clone for Target<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: ?Sized> Copy for Target<'_, R> {}

impl<'a, R: Resource + ?Sized> Target<'a, R> {
    pub fn resource_type(&self) -> &'a str {
        match self {
            Self::Instance(resource) => resource.resource_type(),
            Self::Type(resource_type) => resource_type,
        }
    }

    /// True when the request concerns a concrete resource instance.
    pub fn requires_resource(&self) -> bool {
        matches!(self, Self::Instance(_))
    }
}

/// The frame condition trees are evaluated against.
///
/// Holds the serialized subject and, only when the request targets a
/// concrete instance, the serialized resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    pub subject: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
}

impl AuthContext {
    /// Build a context from already-serialized values.
    pub fn from_values(subject: Value, resource: Option<Value>) -> Self {
        Self { subject, resource }
    }

    /// Build a subject-only context.
    pub fn for_subject<S: Serialize + ?Sized>(subject: &S) -> WarrantResult<Self> {
        Ok(Self {
            subject: to_context_value("subject", subject)?,
            resource: None,
        })
    }

    /// Build a context carrying both subject and resource.
    pub fn for_resource<S, R>(subject: &S, resource: &R) -> WarrantResult<Self>
    where
        S: Serialize + ?Sized,
        R: Serialize + ?Sized,
    {
        Ok(Self {
            subject: to_context_value("subject", subject)?,
            resource: Some(to_context_value("resource", resource)?),
        })
    }

    /// Build the context matching `target`: the resource is present iff the
    /// target is an instance.
    pub fn for_target<S, R>(subject: &S, target: &Target<'_, R>) -> WarrantResult<Self>
    where
        S: Serialize + ?Sized,
        R: Resource + ?Sized,
    {
        match target {
            Target::Instance(resource) => Self::for_resource(subject, *resource),
            Target::Type(_) => Self::for_subject(subject),
        }
    }

    pub fn has_resource(&self) -> bool {
        self.resource.is_some()
    }

    /// Look up a top-level context key (`subject` or `resource`).
    pub fn root(&self, key: &str) -> Option<&Value> {
        match key {
            "subject" => Some(&self.subject),
            "resource" => self.resource.as_ref(),
            _ => None,
        }
    }
}

fn to_context_value<T: Serialize + ?Sized>(what: &str, value: &T) -> WarrantResult<Value> {
    serde_json::to_value(value).map_err(|e| WarrantError::Context {
        reason: format!("failed to serialize {what}: {e}"),
    })
}
