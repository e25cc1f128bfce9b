//! # Mapping Engine
//!
//! A [`Mapping`] translates between one source's native data and one
//! datatype's canonical items, in both directions.
//!
//! ## From the source
//!
//! 1. Extract the nodes at the mapping path (an array yields one node per
//!    element).
//! 2. Drop nodes rejected by the qualifier.
//! 3. Read every field mapper from the node.
//! 4. Cast the assembled data through the datatype.
//! 5. Run the transform pipeline, then the `filter_from` pipeline.
//!
//! ## To the source
//!
//! 1. Run the `filter_to` pipeline. Any rejection means nothing to write.
//! 2. Run the transform pipeline.
//! 3. Write every field mapper's value into the target node.

pub mod field;
pub mod path;
pub mod pipeline;
pub mod qualifier;

pub use field::FieldMapper;
pub use path::Path;
pub use pipeline::{
    Filter, FilterPipeline, Filters, Named, Transform, TransformPipeline, Transformers,
};
pub use qualifier::Qualifier;

use crate::datatype::{Datatype, Formatter};
use crate::model::Item;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Bidirectional transform between a source's native shape and a datatype.
#[derive(Clone)]
pub struct Mapping {
    pub id: Option<String>,
    pub source: Option<String>,
    pub path: Path,
    datatype: Arc<Datatype>,
    fields: Vec<FieldMapper>,
    qualifier: Option<Qualifier>,
    transform: TransformPipeline,
    filter_from: FilterPipeline,
    filter_to: FilterPipeline,
}

impl Mapping {
    pub fn new(datatype: Arc<Datatype>) -> Self {
        Self {
            id: None,
            source: None,
            path: Path::root(),
            datatype,
            fields: Vec::new(),
            qualifier: None,
            transform: TransformPipeline::default(),
            filter_from: FilterPipeline::default(),
            filter_to: FilterPipeline::default(),
        }
    }

    pub fn item_type(&self) -> &str {
        &self.datatype.id
    }

    pub fn datatype(&self) -> &Arc<Datatype> {
        &self.datatype
    }

    pub fn fields(&self) -> &[FieldMapper] {
        &self.fields
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    /// Maps attribute `key` to `path`. Keys the datatype doesn't declare are
    /// ignored.
    pub fn map_attribute(
        mut self,
        key: &str,
        path: Path,
        formatter: Option<Arc<dyn Formatter>>,
    ) -> Self {
        let Some(def) = self.datatype.attributes.get(key) else {
            debug!(item_type = %self.datatype.id, key, "Ignoring undeclared attribute mapping");
            return self;
        };
        let mapper = FieldMapper::attribute(key, def.attr_type.clone(), path);
        self.fields.push(with_optional_formatter(mapper, formatter));
        self
    }

    /// Maps relationship `key` to `path`. Keys the datatype doesn't declare
    /// are ignored.
    pub fn map_relationship(
        mut self,
        key: &str,
        path: Path,
        formatter: Option<Arc<dyn Formatter>>,
    ) -> Self {
        let Some(def) = self.datatype.relationships.get(key) else {
            debug!(item_type = %self.datatype.id, key, "Ignoring undeclared relationship mapping");
            return self;
        };
        let mapper = FieldMapper::relationship(key, def.rel_type.clone(), path);
        self.fields.push(with_optional_formatter(mapper, formatter));
        self
    }

    /// Adds paths read when the primary path of the field mapped last under
    /// `key` yields nothing.
    pub fn with_fallback_paths(mut self, key: &str, paths: Vec<Path>) -> Self {
        if paths.is_empty() {
            return self;
        }
        if let Some(field) = self.fields.iter_mut().rev().find(|f| f.key == key) {
            field.fallbacks = paths;
        }
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    pub fn with_transform(mut self, pipeline: TransformPipeline) -> Self {
        self.transform = pipeline;
        self
    }

    pub fn with_filter_from(mut self, pipeline: FilterPipeline) -> Self {
        self.filter_from = pipeline;
        self
    }

    pub fn with_filter_to(mut self, pipeline: FilterPipeline) -> Self {
        self.filter_to = pipeline;
        self
    }

    /// Maps source data to canonical items. Never fails; an empty vec means
    /// nothing matched or everything was filtered out.
    ///
    /// When exactly one node is mapped and it yields no id, `params.id` is
    /// used.
    pub fn from_source(
        &self,
        data: &Value,
        params: &Map<String, Value>,
        use_defaults: bool,
    ) -> Vec<Item> {
        let nodes = match self.path.get(data) {
            Value::Null => Vec::new(),
            Value::Array(nodes) => nodes,
            node => vec![node],
        };
        let single = nodes.len() == 1;

        nodes
            .iter()
            .filter(|node| self.qualifier.as_ref().map_or(true, |q| q.matches(node)))
            .map(|node| {
                let mut raw = self.assemble(node);
                if single && raw.get("attributes").and_then(|a| a.get("id")).is_none() {
                    if let Some(id) = params.get("id").filter(|id| !id.is_null()) {
                        raw["id"] = id.clone();
                    }
                }
                self.transform.run(self.datatype.cast(&raw, use_defaults))
            })
            .filter(|item| self.filter_from.accepts(item))
            .collect()
    }

    fn assemble(&self, node: &Value) -> Value {
        let mut attributes = Map::new();
        let mut relationships = Map::new();
        for field in &self.fields {
            let value = field.read(node);
            if value.is_null() {
                continue;
            }
            if field.relationship {
                relationships.insert(field.key.clone(), value);
            } else {
                attributes.insert(field.key.clone(), value);
            }
        }
        let mut raw = Map::new();
        raw.insert("attributes".into(), Value::Object(attributes));
        raw.insert("relationships".into(), Value::Object(relationships));
        Value::Object(raw)
    }

    /// Maps an item to the source's shape, writing into `target` (an empty
    /// object by default). `None` means there is nothing to write.
    pub fn to_source(&self, item: Option<&Item>, target: Option<Value>) -> Option<Value> {
        let item = item?;
        if !self.filter_to.accepts(item) {
            debug!(item_type = %self.datatype.id, id = ?item.id, "Filtered out before writing");
            return None;
        }
        let item = self.transform.run(item.clone());
        let mut target = target.unwrap_or_else(|| Value::Object(Map::new()));
        for field in &self.fields {
            if let Some(value) = field.value_of(&item) {
                field.write(value, &mut target);
            }
        }
        Some(target)
    }
}

fn with_optional_formatter(
    mapper: FieldMapper,
    formatter: Option<Arc<dyn Formatter>>,
) -> FieldMapper {
    match formatter {
        Some(formatter) => mapper.with_formatter(formatter),
        None => mapper,
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("id", &self.id)
            .field("type", &self.datatype.id)
            .field("source", &self.source)
            .field("path", &self.path.as_str())
            .field("fields", &self.fields)
            .field("transform", &self.transform.len())
            .field("filter_from", &self.filter_from.len())
            .field("filter_to", &self.filter_to.len())
            .finish()
    }
}
