//! Canonical items: the shape every source's data is cast into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A typed reference to another item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub id: String,
    #[serde(rename = "type")]
    pub ref_type: String,
}

impl Ref {
    pub fn new(id: impl Into<String>, ref_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ref_type: ref_type.into(),
        }
    }
}

/// A relationship value: one reference or many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation {
    Many(Vec<Ref>),
    One(Ref),
}

impl Relation {
    /// The referenced ids, in order.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Self::One(r) => vec![r.id.as_str()],
            Self::Many(refs) => refs.iter().map(|r| r.id.as_str()).collect(),
        }
    }
}

/// An item in canonical form.
///
/// `attributes` always contains the `createdAt` and `updatedAt` slots once the
/// item has been cast through its datatype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub relationships: BTreeMap<String, Option<Relation>>,
}

impl Item {
    pub fn new(id: Option<String>, item_type: impl Into<String>) -> Self {
        Self {
            id,
            item_type: item_type.into(),
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_relationship(mut self, key: impl Into<String>, relation: Relation) -> Self {
        self.relationships.insert(key.into(), Some(relation));
        self
    }

    /// Reads a field by name: `id` and `type` resolve to the top-level slots,
    /// everything else to an attribute, then a relationship.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "id" => self.id.clone().map(Value::String),
            "type" => Some(Value::String(self.item_type.clone())),
            _ => self.attributes.get(key).cloned().or_else(|| {
                self.relationships
                    .get(key)
                    .map(|rel| relation_to_value(rel.as_ref()))
            }),
        }
    }

    /// Builds an item from a loosely shaped JSON value. Used by handlers that
    /// receive items in a payload.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Collapses a relation to the plain id (or ids) written to a source.
pub fn relation_to_value(relation: Option<&Relation>) -> Value {
    match relation {
        None => Value::Null,
        Some(Relation::One(r)) => Value::String(r.id.clone()),
        Some(Relation::Many(refs)) => {
            Value::Array(refs.iter().map(|r| Value::String(r.id.clone())).collect())
        }
    }
}

/// Serializes items for an envelope's `data`.
pub fn items_to_value(items: &[Item]) -> Value {
    Value::Array(items.iter().map(Item::to_value).collect())
}

/// Reads a plain JSON object into attribute form (`Map` → `BTreeMap`).
pub fn object_to_attributes(object: &Map<String, Value>) -> BTreeMap<String, Value> {
    object.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relation_serializes_as_reference_or_list() {
        let one = Relation::One(Ref::new("john", "user"));
        assert_eq!(serde_json::to_value(&one).unwrap(), json!({"id": "john", "type": "user"}));

        let many = Relation::Many(vec![Ref::new("news", "feed"), Ref::new("social", "feed")]);
        assert_eq!(many.ids(), vec!["news", "social"]);
    }

    #[test]
    fn item_reads_from_loose_json() {
        let item = Item::from_value(&json!({
            "id": "ent1",
            "type": "entry",
            "attributes": {"title": "Entry 1"}
        }))
        .unwrap();

        assert_eq!(item.field("id"), Some(json!("ent1")));
        assert_eq!(item.field("title"), Some(json!("Entry 1")));
        assert!(item.relationships.is_empty());
    }
}
