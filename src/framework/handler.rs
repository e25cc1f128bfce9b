//! Action handlers and the table routing action types to them.

use super::dispatcher::Resources;
use crate::model::{Action, Envelope};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Handles one kind of action.
///
/// Handlers validate their payload before any I/O and report every outcome
/// as an [`Envelope`].
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, action: Action, resources: &Resources) -> Envelope;
}

/// Immutable mapping from action type to handler, fixed at construction.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, action_type: impl Into<String>, handler: impl ActionHandler + 'static) -> Self {
        self.handlers.insert(action_type.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, action_type: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(action_type)
    }

    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().collect();
        types.sort();
        f.debug_struct("HandlerTable").field("types", &types).finish()
    }
}
