//! # Datatype Registry
//!
//! A [`Datatype`] is the canonical schema of one resource type: its
//! attributes (with semantic types and defaults), its relationships, and the
//! access rule guarding it. Every datatype implicitly carries the `id`,
//! `type`, `createdAt` and `updatedAt` attribute slots.
//!
//! Datatypes are built once by the configuration load step and shared
//! read-only through [`Datatypes`].

pub mod access;
mod cast;
pub mod formatter;

pub use access::AccessRule;
pub use formatter::{Formatter, Formatters};

pub(crate) use cast::normalize_relation;

use crate::model::Item;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// An attribute's semantic type and optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    pub attr_type: String,
    /// `None` means no default was configured.
    pub default: Option<Value>,
}

impl AttributeDef {
    pub fn new(attr_type: impl Into<String>) -> Self {
        Self {
            attr_type: attr_type.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A relationship's target type, optional default id and optional query
/// template.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipDef {
    pub rel_type: String,
    pub default: Option<Value>,
    /// Values naming a field of the owning item are replaced by that field's
    /// value in [`Datatype::cast_query_params`].
    pub query: Option<Map<String, Value>>,
}

impl RelationshipDef {
    pub fn new(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            default: None,
            query: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = Some(query);
        self
    }
}

/// Canonical schema for one resource type.
#[derive(Debug, Clone)]
pub struct Datatype {
    pub id: String,
    pub plural: String,
    /// Default source for this type.
    pub source: Option<String>,
    pub attributes: BTreeMap<String, AttributeDef>,
    pub relationships: BTreeMap<String, RelationshipDef>,
    pub access: AccessRule,
    pub internal: bool,
    formatters: Formatters,
}

impl Datatype {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut datatype = Self {
            plural: format!("{id}s"),
            id,
            source: None,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            access: AccessRule::default(),
            internal: false,
            formatters: Formatters::builtin(),
        };
        datatype.add_fixed_attributes();
        datatype
    }

    fn add_fixed_attributes(&mut self) {
        self.attributes.insert("id".into(), AttributeDef::new("string"));
        self.attributes.insert("type".into(), AttributeDef::new("string"));
        self.attributes.insert("createdAt".into(), AttributeDef::new("date"));
        self.attributes.insert("updatedAt".into(), AttributeDef::new("date"));
    }

    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds an attribute. The fixed slots (`id`, `type`, `createdAt`,
    /// `updatedAt`) can't be redefined.
    pub fn with_attribute(mut self, key: impl Into<String>, def: AttributeDef) -> Self {
        let key = key.into();
        if !matches!(key.as_str(), "id" | "type" | "createdAt" | "updatedAt") {
            self.attributes.insert(key, def);
        }
        self
    }

    pub fn with_relationship(mut self, key: impl Into<String>, def: RelationshipDef) -> Self {
        self.relationships.insert(key.into(), def);
        self
    }

    pub fn with_access(mut self, access: AccessRule) -> Self {
        self.access = access;
        self
    }

    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Formatters used to convert attribute values by semantic type.
    pub fn with_formatters(mut self, formatters: Formatters) -> Self {
        self.formatters = formatters;
        self
    }

    /// Casts loosely shaped data (`{id?, attributes?, relationships?}`) into
    /// an item of this type.
    ///
    /// Attribute values go through the formatter registered for their
    /// semantic type. Absent values get the configured default when
    /// `use_defaults` is set, `null` otherwise. Relationships are expanded to
    /// `{id, type}` references.
    pub fn cast(&self, data: &Value, use_defaults: bool) -> Item {
        cast::cast(self, data, use_defaults)
    }

    /// Builds the query for looking up the items of relationship `rel_id`,
    /// filling the relationship's query template from `item`.
    pub fn cast_query_params(&self, rel_id: &str, item: &Item) -> Map<String, Value> {
        let Some(query) = self.relationships.get(rel_id).and_then(|r| r.query.as_ref()) else {
            return Map::new();
        };
        query
            .iter()
            .map(|(key, template)| {
                let value = template
                    .as_str()
                    .and_then(|field| item.field(field))
                    .unwrap_or_else(|| template.clone());
                (key.clone(), value)
            })
            .collect()
    }
}

/// Read-only registry of datatypes keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Datatypes {
    types: HashMap<String, Arc<Datatype>>,
}

impl Datatypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when a datatype with the same id already exists.
    pub fn insert(&mut self, datatype: Datatype) -> bool {
        if self.types.contains_key(&datatype.id) {
            return false;
        }
        self.types.insert(datatype.id.clone(), Arc::new(datatype));
        true
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Datatype>> {
        self.types.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// The plural form for `id`, falling back to `"{id}s"` for unknown types.
    pub fn plural_of(&self, id: &str) -> String {
        self.types
            .get(id)
            .map_or_else(|| format!("{id}s"), |d| d.plural.clone())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Datatype>> {
        self.types.values()
    }
}
