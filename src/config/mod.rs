//! # Configuration
//!
//! Definitions ([`Defs`]) are plain serde structs read from JSON. Code the
//! definitions refer to by name (adapters, auth strategies, formatters,
//! transformers, filters) is supplied separately through [`Plugins`].
//!
//! [`load`] normalizes the definitions against the plugins and builds the
//! read-only registries used at dispatch time.

pub mod defs;
mod load;

pub use defs::{
    AccessDef, AttributeSpec, AuthDef, DatatypeDef, Defs, EndpointDef, FieldSpec, MappingDef,
    OneOrMany, RelationshipSpec, SourceDef,
};
pub use load::{load, Loaded};

use crate::datatype::{Formatter, Formatters};
use crate::framework::{HandlerTable, Middleware, Queue};
use crate::mapping::{Filters, Transformers};
use crate::model::Item;
use crate::source::{Adapter, AuthStrategies, AuthStrategy};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named code referenced from definitions, plus the dispatch collaborators.
#[derive(Clone, Default)]
pub struct Plugins {
    pub adapters: HashMap<String, Arc<dyn Adapter>>,
    pub auth_strategies: AuthStrategies,
    /// Merged over the built-in formatters.
    pub formatters: Formatters,
    pub transformers: Transformers,
    pub filters: Filters,
    /// `None` uses [`default_handlers`](crate::actions::default_handlers).
    pub handlers: Option<HandlerTable>,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub queue: Option<Arc<dyn Queue>>,
    pub subscriber: Option<tracing::Dispatch>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, name: impl Into<String>, adapter: impl Adapter + 'static) -> Self {
        self.adapters.insert(name.into(), Arc::new(adapter));
        self
    }

    pub fn with_auth_strategy(
        mut self,
        name: impl Into<String>,
        strategy: impl AuthStrategy + 'static,
    ) -> Self {
        self.auth_strategies = self.auth_strategies.with(name, strategy);
        self
    }

    pub fn with_formatter(mut self, name: impl Into<String>, formatter: impl Formatter + 'static) -> Self {
        self.formatters = self.formatters.with(name, formatter);
        self
    }

    pub fn with_transformer(
        mut self,
        name: impl Into<String>,
        transform: impl Fn(Item) -> Item + Send + Sync + 'static,
    ) -> Self {
        self.transformers = self.transformers.with(name, transform);
        self
    }

    pub fn with_filter(
        mut self,
        name: impl Into<String>,
        filter: impl Fn(&Item) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filters = self.filters.with(name, filter);
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Appends a middleware. Earlier ones wrap later ones.
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn with_queue(mut self, queue: impl Queue + 'static) -> Self {
        self.queue = Some(Arc::new(queue));
        self
    }

    pub fn with_subscriber(mut self, subscriber: tracing::Dispatch) -> Self {
        self.subscriber = Some(subscriber);
        self
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adapters: Vec<_> = self.adapters.keys().collect();
        adapters.sort();
        f.debug_struct("Plugins")
            .field("adapters", &adapters)
            .field("auth_strategies", &self.auth_strategies)
            .field("formatters", &self.formatters)
            .field("transformers", &self.transformers)
            .field("filters", &self.filters)
            .field("handlers", &self.handlers)
            .field("middleware", &self.middleware.len())
            .field("queue", &self.queue.is_some())
            .finish()
    }
}
