//! Query keys and options.
//!
//! [`Filter`] and [`ParentKey`] double as cache keys inside the store, so both
//! compare by value: two filters built from the same pairs in a different
//! order are the same key.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Attributes;

/// Equality filter for a `where` query, e.g. `{status: "draft"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) one criterion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Criteria in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if every criterion has an equal value in `attributes`.
    ///
    /// Keys present only in `attributes` are ignored. Non-string attribute
    /// values are compared through their JSON text (`3`, `true`).
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.iter().all(|(key, expected)| match attributes.get(key) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == expected,
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

/// Identifies the owner of a related-resources query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParentKey {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
}

impl ParentKey {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ParentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// Extra query parameters (includes, sparse fieldsets, sorting, paging).
///
/// The store never looks inside; they are handed to the API client as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions(BTreeMap<String, String>);

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `include=<paths>`
    pub fn include(self, paths: impl Into<String>) -> Self {
        self.param("include", paths)
    }

    /// `fields[<resource_type>]=<fields>`
    pub fn fields(self, resource_type: &str, fields: impl Into<String>) -> Self {
        self.param(format!("fields[{resource_type}]"), fields)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Renders the options as an unencoded query string, e.g.
/// `fields[widgets]=title&include=customers`.
impl fmt::Display for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
