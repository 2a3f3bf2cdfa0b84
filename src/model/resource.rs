use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute map of a resource (`attributes` member of a JSON:API resource object).
pub type Attributes = Map<String, Value>;

/// Relationship map of a resource. Each value is a relationship object,
/// usually `{"data": {"type": .., "id": ..}}` or `{"data": [..]}`.
pub type Relationships = Map<String, Value>;

/// A JSON:API resource object as exchanged with the API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub relationships: Relationships,
}

impl Resource {
    /// Creates a resource with no attributes or relationships.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            attributes: Attributes::new(),
            relationships: Relationships::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_relationship(mut self, key: impl Into<String>, value: Value) -> Self {
        self.relationships.insert(key.into(), value);
        self
    }

    /// Returns true if any relationship links to the resource `(resource_type, id)`.
    ///
    /// Both to-one (`data` object) and to-many (`data` array) linkage is checked.
    pub fn links_to(&self, resource_type: &str, id: &str) -> bool {
        let is_target = |linkage: &Value| {
            linkage.get("type").and_then(Value::as_str) == Some(resource_type)
                && linkage.get("id").and_then(Value::as_str) == Some(id)
        };
        self.relationships.values().any(|relationship| {
            match relationship.get("data") {
                Some(Value::Array(items)) => items.iter().any(is_target),
                Some(linkage @ Value::Object(_)) => is_target(linkage),
                _ => false,
            }
        })
    }
}

/// Payload for creating a resource. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub relationships: Relationships,
}

impl NewResource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: Attributes::new(),
            relationships: Relationships::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_relationship(mut self, key: impl Into<String>, value: Value) -> Self {
        self.relationships.insert(key.into(), value);
        self
    }

    /// Turns the payload into a full resource once an id has been assigned.
    pub fn into_resource(self, id: impl Into<String>) -> Resource {
        Resource {
            resource_type: self.resource_type,
            id: id.into(),
            attributes: self.attributes,
            relationships: self.relationships,
        }
    }
}

/// Top-level response document: `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

impl<T> Document<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_deserializes_without_optional_members() {
        let resource: Resource = serde_json::from_value(json!({
            "type": "widgets",
            "id": "27",
        }))
        .unwrap();

        assert_eq!(resource.resource_type, "widgets");
        assert_eq!(resource.id, "27");
        assert!(resource.attributes.is_empty());
        assert!(resource.relationships.is_empty());
    }

    #[test]
    fn test_links_to_single_and_many() {
        let single = Resource::new("widgets", "1")
            .with_relationship("owner", json!({ "data": { "type": "users", "id": "5" } }));
        let many = Resource::new("widgets", "2").with_relationship(
            "categories",
            json!({ "data": [{ "type": "categories", "id": "a" }, { "type": "categories", "id": "b" }] }),
        );

        assert!(single.links_to("users", "5"));
        assert!(!single.links_to("users", "6"));
        assert!(many.links_to("categories", "b"));
        assert!(!many.links_to("users", "b"));
    }

    #[test]
    fn test_new_resource_into_resource_keeps_fields() {
        let created = NewResource::new("widgets")
            .with_attribute("title", "Baz")
            .into_resource("99");

        assert_eq!(created.id, "99");
        assert_eq!(created.attributes["title"], json!("Baz"));
    }
}
