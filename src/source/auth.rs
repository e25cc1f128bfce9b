//! Authentication collaborators.
//!
//! An [`AuthStrategy`] is a factory registered by name. Each auth definition
//! creates one [`Authenticator`] from its options; sources referencing the
//! definition share it.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Authenticator: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Attempts to authenticate. Returns `false` on failure.
    async fn authenticate(&self) -> bool;

    /// Headers added to every request once authenticated.
    fn headers(&self) -> Map<String, Value>;
}

pub trait AuthStrategy: Send + Sync {
    fn create(&self, options: &Map<String, Value>) -> Arc<dyn Authenticator>;
}

impl<F> AuthStrategy for F
where
    F: Fn(&Map<String, Value>) -> Arc<dyn Authenticator> + Send + Sync,
{
    fn create(&self, options: &Map<String, Value>) -> Arc<dyn Authenticator> {
        self(options)
    }
}

/// Auth strategies by name.
#[derive(Clone, Default)]
pub struct AuthStrategies {
    strategies: HashMap<String, Arc<dyn AuthStrategy>>,
}

impl AuthStrategies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, strategy: impl AuthStrategy + 'static) -> Self {
        self.strategies.insert(name.into(), Arc::new(strategy));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AuthStrategy>> {
        self.strategies.get(name)
    }
}

impl std::fmt::Debug for AuthStrategies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("AuthStrategies").field("names", &names).finish()
    }
}
