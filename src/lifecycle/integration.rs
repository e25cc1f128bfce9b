use crate::actions::default_handlers;
use crate::config::{load, Defs, Loaded, Plugins};
use crate::datatype::Datatypes;
use crate::error::ConfigError;
use crate::framework::{Dispatcher, IdentOptions};
use crate::model::{Action, Envelope};
use crate::source::Sources;
use std::sync::Arc;
use tracing::info;

/// A configured integration: registries built from definitions, plus the
/// dispatcher wired to them.
///
/// `Integration` is responsible for:
/// - **Loading**: Normalizing definitions against the supplied plugins
/// - **Wiring**: Building the dispatcher with handlers, middleware and queue
/// - **Access**: Exposing the read-only registries
///
/// # Example
///
/// ```ignore
/// let plugins = Plugins::new().with_adapter("json", JsonAdapter::new());
/// let integration = Integration::from_json(DEFS, plugins)?;
///
/// let response = integration
///     .dispatch(Some(Action::new("GET", json!({"type": "entry", "id": "ent1"}))))
///     .await;
/// ```
#[derive(Debug, Clone)]
pub struct Integration {
    dispatcher: Dispatcher,
    datatypes: Arc<Datatypes>,
    sources: Arc<Sources>,
    ident: IdentOptions,
}

impl Integration {
    /// Loads `defs` and wires the dispatcher.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from the load step, including missing sources or
    /// datatypes.
    pub fn new(defs: Defs, plugins: Plugins) -> Result<Self, ConfigError> {
        let Loaded {
            datatypes,
            sources,
            ident,
        } = load(defs, &plugins)?;
        let datatypes = Arc::new(datatypes);
        let sources = Arc::new(sources);

        let Plugins {
            handlers,
            middleware,
            queue,
            subscriber,
            ..
        } = plugins;

        let mut builder = Dispatcher::builder()
            .handlers(handlers.unwrap_or_else(default_handlers))
            .datatypes(datatypes.clone())
            .sources(sources.clone())
            .ident(ident.clone());
        for layer in middleware {
            builder = builder.middleware_arc(layer);
        }
        if let Some(queue) = queue {
            builder = builder.queue(queue);
        }
        if let Some(subscriber) = subscriber {
            builder = builder.subscriber(subscriber);
        }

        info!(
            sources = sources.len(),
            version = Self::version(),
            "Integration ready"
        );
        Ok(Self {
            dispatcher: builder.build(),
            datatypes,
            sources,
            ident,
        })
    }

    /// Parses JSON definitions, then behaves like [`Integration::new`].
    pub fn from_json(json: &str, plugins: Plugins) -> Result<Self, ConfigError> {
        Self::new(Defs::from_json(json)?, plugins)
    }

    pub async fn dispatch(&self, action: Option<Action>) -> Envelope {
        self.dispatcher.dispatch(action).await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn datatypes(&self) -> &Datatypes {
        &self.datatypes
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// The datatype representing idents, if configured.
    pub fn ident_type(&self) -> Option<&str> {
        self.ident.ident_type.as_deref()
    }

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockAdapter;
    use crate::model::Status;
    use serde_json::json;

    const DEFS: &str = r#"{
        "sources": [{"id": "entries", "adapter": "json", "endpoints": [{}]}],
        "datatypes": [{"id": "entry", "source": "entries", "attributes": {"title": "string"}}],
        "ident": {"type": "user"}
    }"#;

    #[test]
    fn fails_without_sources() {
        let result = Integration::from_json(r#"{"datatypes": [{"id": "entry"}]}"#, Plugins::new());
        assert!(matches!(result, Err(ConfigError::NoSources)));
    }

    #[test]
    fn exposes_registries_and_ident_type() {
        let plugins = Plugins::new().with_adapter("json", MockAdapter::new());
        let integration = Integration::from_json(DEFS, plugins).unwrap();

        assert!(integration.datatypes().get("entry").is_some());
        assert!(integration.sources().get("entries").is_some());
        assert_eq!(integration.ident_type(), Some("user"));
        assert_eq!(Integration::version(), env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn dispatches_with_default_handlers() {
        let adapter = MockAdapter::new();
        adapter
            .expect_retrieve()
            .return_ok(json!([{"id": "ent1", "title": "Entry 1"}]));
        let plugins = Plugins::new().with_adapter("json", adapter.clone());
        let integration = Integration::from_json(DEFS, plugins).unwrap();

        let envelope = integration
            .dispatch(Some(Action::new("GET", json!({"type": "entry"}))))
            .await;

        assert_eq!(envelope.status, Status::Ok);
        adapter.verify();
    }
}
