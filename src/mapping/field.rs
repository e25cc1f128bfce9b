//! Field mappers: one canonical field ↔ one path in a source node.

use super::path::Path;
use crate::datatype::Formatter;
use crate::model::{relation_to_value, Item};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Maps a single attribute or relationship between a source node and an
/// item.
#[derive(Clone)]
pub struct FieldMapper {
    pub key: String,
    /// Semantic type for attributes, target type for relationships.
    pub field_type: String,
    pub path: Path,
    /// Read in order when `path` yields nothing. Writes only use `path`.
    pub fallbacks: Vec<Path>,
    pub relationship: bool,
    formatter: Option<Arc<dyn Formatter>>,
}

impl FieldMapper {
    pub fn attribute(key: impl Into<String>, field_type: impl Into<String>, path: Path) -> Self {
        Self {
            key: key.into(),
            field_type: field_type.into(),
            path,
            fallbacks: Vec::new(),
            relationship: false,
            formatter: None,
        }
    }

    pub fn relationship(key: impl Into<String>, rel_type: impl Into<String>, path: Path) -> Self {
        Self {
            relationship: true,
            ..Self::attribute(key, rel_type, path)
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<Path>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Reads this field from a source node, through the formatter's inbound
    /// conversion.
    pub fn read(&self, node: &Value) -> Value {
        let value = std::iter::once(&self.path)
            .chain(&self.fallbacks)
            .map(|path| path.get(node))
            .find(|value| !value.is_null())
            .unwrap_or(Value::Null);
        match (&self.formatter, value.is_null()) {
            (Some(formatter), false) => formatter.from_source(value),
            _ => value,
        }
    }

    /// Writes a canonical value into a target node, through the formatter's
    /// outbound conversion.
    pub fn write(&self, value: Value, target: &mut Value) {
        let value = match &self.formatter {
            Some(formatter) if !value.is_null() => formatter.to_source(value),
            _ => value,
        };
        self.path.set(target, value);
    }

    /// The canonical value this mapper writes for `item`. `None` when the item
    /// has no such field.
    pub fn value_of(&self, item: &Item) -> Option<Value> {
        if self.relationship {
            return item
                .relationships
                .get(&self.key)
                .map(|rel| relation_to_value(rel.as_ref()));
        }
        match self.key.as_str() {
            "id" => item.id.clone().map(Value::String),
            "type" => Some(Value::String(item.item_type.clone())),
            key => item.attributes.get(key).cloned(),
        }
    }
}

impl fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapper")
            .field("key", &self.key)
            .field("field_type", &self.field_type)
            .field("path", &self.path.as_str())
            .field("fallbacks", &self.fallbacks.len())
            .field("relationship", &self.relationship)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ref, Relation};
    use serde_json::json;

    struct Cents;

    impl Formatter for Cents {
        fn from_source(&self, value: Value) -> Value {
            json!(value.as_f64().unwrap_or_default() / 100.0)
        }

        fn to_source(&self, value: Value) -> Value {
            json!((value.as_f64().unwrap_or_default() * 100.0).round() as i64)
        }
    }

    #[test]
    fn reads_and_writes_through_formatter() {
        let mapper = FieldMapper::attribute("price", "float", Path::compile("pricing.cents").unwrap())
            .with_formatter(Arc::new(Cents));

        assert_eq!(mapper.read(&json!({"pricing": {"cents": 1250}})), json!(12.5));

        let mut target = json!({});
        mapper.write(json!(12.5), &mut target);
        assert_eq!(target, json!({"pricing": {"cents": 1250}}));
    }

    #[test]
    fn reads_first_non_null_path() {
        let mapper = FieldMapper::attribute("title", "string", Path::compile("headline").unwrap())
            .with_fallbacks(vec![Path::compile("name").unwrap()]);

        assert_eq!(mapper.read(&json!({"name": "Fallback"})), json!("Fallback"));
        assert_eq!(mapper.read(&json!({"headline": "First", "name": "Fallback"})), json!("First"));
        assert_eq!(mapper.read(&json!({})), Value::Null);
    }

    #[test]
    fn relationship_writes_plain_ids() {
        let mapper = FieldMapper::relationship("feeds", "feed", Path::compile("feeds").unwrap());
        let item = Item::new(Some("johnf".into()), "user").with_relationship(
            "feeds",
            Relation::Many(vec![Ref::new("news", "feed"), Ref::new("social", "feed")]),
        );

        assert_eq!(mapper.value_of(&item), Some(json!(["news", "social"])));
    }
}
