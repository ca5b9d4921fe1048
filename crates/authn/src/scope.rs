//! Registry scope parsing.
//!
//! Registry clients send the requested capabilities either as one
//! space-delimited `scope` string or as a repeated `scope` parameter. Each
//! entry has the compact grammar
//!
//! ```text
//! type[(class)]:name:action[,action...]
//! ```
//!
//! e.g. `repository:model-a/img:pull,push`. The type ends at the first `:`
//! and the actions start after the last `:`, so names that themselves
//! contain a colon (a registry host with a port) survive intact.
//!
//! Parsing never fails: values are not validated here, malformed entries
//! are refused later by the authorization decider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthError, Result};

/// The action registry clients send to download an image.
pub const PULL_ACTION: &str = "pull";

/// The resource type naming image repositories.
pub const REPOSITORY_TYPE: &str = "repository";

/// The raw `scope` parameter in either of the shapes clients send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeParam {
    /// One string, entries separated by whitespace.
    Single(String),
    /// One entry per element.
    Many(Vec<String>),
}

impl ScopeParam {
    /// Normalizes an arbitrary JSON value into a scope.
    ///
    /// `null` means no scope was sent. Used for JSON request bodies, where
    /// the client controls the value's type.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ScopeFormat`] for numbers, booleans, objects, or
    /// arrays holding anything other than strings.
    pub fn from_value(value: Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(scope) => Ok(Some(Self::Single(scope))),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(entry) => Ok(entry),
                    other => Err(AuthError::scope_format(format!(
                        "array element of type {}",
                        json_type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(|entries| Some(Self::Many(entries))),
            other => Err(AuthError::scope_format(json_type_name(&other))),
        }
    }

    /// Iterates over the non-blank entries.
    pub fn entries(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Single(scope) => Box::new(scope.split_whitespace()),
            Self::Many(entries) => Box::new(
                entries.iter().map(String::as_str).filter(|entry| !entry.trim().is_empty()),
            ),
        }
    }

    /// Returns `true` if no access is requested (a login probe).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }
}

impl From<&str> for ScopeParam {
    fn from(scope: &str) -> Self {
        Self::Single(scope.to_owned())
    }
}

impl From<Vec<String>> for ScopeParam {
    fn from(entries: Vec<String>) -> Self {
        Self::Many(entries)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One requested repository-scoped capability.
///
/// Serializes to the `{type, name, actions}` shape registries expect in the
/// token's `access` claim (plus `class` when the scope carried one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// Resource type, normally `repository`.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Optional resource class from `type(class)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Repository name, e.g. `model-a/img`.
    pub name: String,

    /// Requested actions in the order the client listed them.
    pub actions: Vec<String>,
}

impl AccessRequest {
    /// Creates an access request without a resource class.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, actions: Vec<String>) -> Self {
        Self { resource_type: resource_type.into(), class: None, name: name.into(), actions }
    }

    /// Parses one scope entry.
    ///
    /// Missing segments become empty. Every `,`-separated action token is
    /// kept, empty ones included, so `pull,` is not mistaken for `pull`.
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        let (head, rest) = entry.split_once(':').unwrap_or((entry, ""));
        let (name, actions) = match rest.rsplit_once(':') {
            Some((name, actions)) => (name, Some(actions)),
            None => (rest, None),
        };

        let (resource_type, class) = match head.split_once('(') {
            Some((resource_type, class)) if class.ends_with(')') => {
                (resource_type, Some(class.trim_end_matches(')').to_owned()))
            },
            _ => (head, None),
        };

        Self {
            resource_type: resource_type.to_owned(),
            class,
            name: name.to_owned(),
            actions: actions
                .map(|actions| actions.split(',').map(str::to_owned).collect())
                .unwrap_or_default(),
        }
    }

    /// Returns `true` if the only action requested is `pull`.
    #[must_use]
    pub fn is_pull_only(&self) -> bool {
        matches!(self.actions.as_slice(), [action] if action == PULL_ACTION)
    }

    /// Returns `true` if the resource type is `repository`.
    #[must_use]
    pub fn is_repository(&self) -> bool {
        self.resource_type == REPOSITORY_TYPE
    }

    /// The first path segment of the name, used to look up the owning
    /// model or deployment.
    #[must_use]
    pub fn repository_key(&self) -> &str {
        self.name.split('/').next().unwrap_or_default()
    }
}

/// Parses every entry of a scope parameter.
#[must_use]
pub fn parse_scope(scope: &ScopeParam) -> Vec<AccessRequest> {
    scope.entries().map(AccessRequest::parse).collect()
}
