//! Casting loosely shaped data into canonical items.
//!
//! Casting is total: whatever comes in, an [`Item`] comes out.

use super::{AttributeDef, Datatype, RelationshipDef};
use crate::datatype::formatter::format_date;
use crate::model::{Item, Ref, Relation};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub(super) fn cast(datatype: &Datatype, data: &Value, use_defaults: bool) -> Item {
    let empty = Map::new();
    let attrs_in = data
        .get("attributes")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let rels_in = data
        .get("relationships")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let id = data
        .get("id")
        .or_else(|| attrs_in.get("id"))
        .and_then(id_from_value);

    let mut item = Item::new(id, datatype.id.clone());
    item.attributes = cast_attributes(datatype, attrs_in, use_defaults);
    item.relationships = cast_relationships(&datatype.relationships, rels_in, use_defaults);
    item
}

fn cast_attributes(
    datatype: &Datatype,
    attrs_in: &Map<String, Value>,
    use_defaults: bool,
) -> BTreeMap<String, Value> {
    let mut attributes = BTreeMap::new();
    for (key, def) in &datatype.attributes {
        if key == "id" || key == "type" {
            continue;
        }
        let value = match attrs_in.get(key) {
            Some(raw) if !raw.is_null() => datatype.formatters.cast(&def.attr_type, raw.clone()),
            _ if use_defaults => default_attribute(def),
            _ => Value::Null,
        };
        attributes.insert(key.clone(), value);
    }

    if use_defaults {
        let created_at = match attributes.get("createdAt") {
            Some(value) if !value.is_null() => value.clone(),
            _ => format_date(OffsetDateTime::now_utc()),
        };
        if attributes.get("updatedAt").map_or(true, Value::is_null) {
            attributes.insert("updatedAt".into(), created_at.clone());
        }
        attributes.insert("createdAt".into(), created_at);
    }
    attributes
}

fn default_attribute(def: &AttributeDef) -> Value {
    def.default.clone().unwrap_or(Value::Null)
}

fn cast_relationships(
    defs: &BTreeMap<String, RelationshipDef>,
    rels_in: &Map<String, Value>,
    use_defaults: bool,
) -> BTreeMap<String, Option<Relation>> {
    let mut relationships = BTreeMap::new();
    for (key, def) in defs {
        let raw = rels_in.get(key).filter(|v| !v.is_null());
        match raw {
            Some(raw) => {
                relationships.insert(key.clone(), normalize_relation(raw, &def.rel_type));
            }
            None if use_defaults => {
                if let Some(default) = &def.default {
                    relationships.insert(key.clone(), normalize_relation(default, &def.rel_type));
                }
            }
            None => {}
        }
    }
    relationships
}

/// Expands a bare id, a partial reference or a list of either into a
/// relation. Anything else becomes `None`.
pub(crate) fn normalize_relation(value: &Value, rel_type: &str) -> Option<Relation> {
    match value {
        Value::Array(values) => Some(Relation::Many(
            values
                .iter()
                .filter_map(|v| normalize_ref(v, rel_type))
                .collect(),
        )),
        other => normalize_ref(other, rel_type).map(Relation::One),
    }
}

fn normalize_ref(value: &Value, rel_type: &str) -> Option<Ref> {
    match value {
        Value::Object(obj) => {
            let id = obj.get("id").and_then(id_from_value)?;
            let ref_type = obj
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(rel_type);
            Some(Ref::new(id, ref_type))
        }
        other => id_from_value(other).map(|id| Ref::new(id, rel_type)),
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
