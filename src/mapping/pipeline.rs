//! Named transformers and filters, and the ordered pipelines built from them.

use crate::model::Item;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A pure item → item stage.
pub type Transform = Arc<dyn Fn(Item) -> Item + Send + Sync>;

/// A predicate deciding whether an item passes.
pub type Filter = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// A registry of named pipeline stages.
#[derive(Clone)]
pub struct Named<T> {
    entries: HashMap<String, T>,
}

pub type Transformers = Named<Transform>;
pub type Filters = Named<Filter>;

impl<T> Default for Named<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> Named<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, stage: T) {
        self.entries.insert(name.into(), stage);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    /// Resolves `names` in order. Unknown names are skipped.
    pub fn resolve(&self, names: &[String]) -> Vec<T> {
        names
            .iter()
            .filter_map(|name| {
                let stage = self.entries.get(name).cloned();
                if stage.is_none() {
                    warn!(stage = %name, "Unknown pipeline stage skipped");
                }
                stage
            })
            .collect()
    }
}

impl Transformers {
    pub fn with(mut self, name: impl Into<String>, f: impl Fn(Item) -> Item + Send + Sync + 'static) -> Self {
        self.insert(name, Arc::new(f));
        self
    }
}

impl Filters {
    pub fn with(mut self, name: impl Into<String>, f: impl Fn(&Item) -> bool + Send + Sync + 'static) -> Self {
        self.insert(name, Arc::new(f));
        self
    }
}

impl<T> fmt::Debug for Named<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Named").field("names", &names).finish()
    }
}

/// Ordered transform stages.
#[derive(Clone, Default)]
pub struct TransformPipeline(Vec<Transform>);

impl TransformPipeline {
    pub fn new(stages: Vec<Transform>) -> Self {
        Self(stages)
    }

    pub fn run(&self, item: Item) -> Item {
        self.0.iter().fold(item, |item, stage| stage(item))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Ordered filter predicates. An item is rejected by the first predicate
/// returning `false`; later predicates are not called.
#[derive(Clone, Default)]
pub struct FilterPipeline(Vec<Filter>);

impl FilterPipeline {
    pub fn new(stages: Vec<Filter>) -> Self {
        Self(stages)
    }

    pub fn accepts(&self, item: &Item) -> bool {
        self.0.iter().all(|predicate| predicate(item))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn transforms_run_in_order() {
        let transformers = Transformers::new()
            .with("title", |item: Item| item.with_attribute("title", json!("Entry")))
            .with("shout", |mut item: Item| {
                if let Some(title) = item.attributes.get("title").and_then(|v| v.as_str()) {
                    let loud = title.to_uppercase();
                    item.attributes.insert("title".into(), json!(loud));
                }
                item
            });
        let pipeline = TransformPipeline::new(
            transformers.resolve(&["title".into(), "missing".into(), "shout".into()]),
        );

        assert_eq!(pipeline.len(), 2);
        let item = pipeline.run(Item::new(None, "entry"));
        assert_eq!(item.attributes["title"], json!("ENTRY"));
    }

    #[test]
    fn filters_stop_at_first_rejection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let filters = Filters::new()
            .with("never", |_: &Item| false)
            .with("count", move |_: &Item| {
                counted.fetch_add(1, Ordering::SeqCst);
                true
            });
        let pipeline = FilterPipeline::new(filters.resolve(&["never".into(), "count".into()]));

        assert!(!pipeline.accepts(&Item::new(None, "entry")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(FilterPipeline::default().accepts(&Item::new(None, "entry")));
    }
}
