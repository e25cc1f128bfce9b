//! # Sources
//!
//! A [`Source`] binds one external service: the [`Adapter`] that talks to it,
//! an optional [`Authenticator`], the [`Endpoint`]s it offers and one
//! [`Mapping`] per datatype it serves.
//!
//! Handlers never call adapters directly. They go through the source, which
//! prepares requests, guards them with authentication and maps data in both
//! directions.

pub mod adapter;
pub mod auth;
pub mod request;

pub use adapter::Adapter;
pub use auth::{AuthStrategies, AuthStrategy, Authenticator};
pub use request::{prepare_request, EndpointRef, PrepareContext, RawRequest, Request};

use crate::datatype::Datatypes;
use crate::endpoint::Endpoint;
use crate::mapping::{Mapping, Path};
use crate::model::{Envelope, Item};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Source {
    pub id: String,
    adapter: Arc<dyn Adapter>,
    auth: Option<Arc<dyn Authenticator>>,
    endpoints: Vec<Endpoint>,
    mappings: HashMap<String, Mapping>,
}

impl Source {
    pub fn new(id: impl Into<String>, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            id: id.into(),
            adapter,
            auth: None,
            endpoints: Vec::new(),
            mappings: HashMap::new(),
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Registers a mapping under its item type, replacing any earlier one.
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.insert(mapping.item_type().to_string(), mapping);
        self
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn mapping(&self, item_type: &str) -> Option<&Mapping> {
        self.mappings.get(item_type)
    }

    pub fn prepare_request(&self, raw: RawRequest, datatypes: &Datatypes) -> Request {
        let ctx = PrepareContext {
            endpoints: &self.endpoints,
            datatypes,
            auth: self.auth.as_ref(),
            adapter: self.adapter.as_ref(),
        };
        prepare_request(raw, &ctx)
    }

    #[instrument(skip(self, request), fields(source = %self.id))]
    pub async fn retrieve(&self, request: Request) -> Envelope {
        debug!(params = ?request.params, "retrieve called");
        let request = match self.authorize(request).await {
            Ok(request) => request,
            Err(envelope) => return envelope,
        };
        let response = self.adapter.retrieve(&request).await;
        info!(status = %response.status, "Retrieved");
        response
    }

    #[instrument(skip(self, request), fields(source = %self.id))]
    pub async fn send(&self, request: Request) -> Envelope {
        debug!(params = ?request.params, "send called");
        let request = match self.authorize(request).await {
            Ok(request) => request,
            Err(envelope) => return envelope,
        };
        let response = self.adapter.send(&request).await;
        info!(status = %response.status, "Sent");
        response
    }

    /// Makes sure the request's authenticator is authenticated and adds its
    /// headers.
    async fn authorize(&self, mut request: Request) -> Result<Request, Envelope> {
        let Some(auth) = request.auth.clone() else {
            return Ok(request);
        };
        if !auth.is_authenticated() && !auth.authenticate().await {
            warn!(source = %self.id, "Could not authenticate");
            return Err(Envelope::auth_error(format!(
                "Could not authenticate with source '{}'",
                self.id
            )));
        }
        request.headers.extend(auth.headers());
        Ok(request)
    }

    /// Runs a whole response body through the adapter's normalization.
    ///
    /// The adapter always gets the root path. Mapping paths are extracted by
    /// [`map_from_source`](Source::map_from_source), once.
    pub fn normalize(&self, data: Value) -> Value {
        self.adapter.normalize(data, &Path::root())
    }

    /// Maps normalized data to items of every type in `item_types`, in order.
    /// Types without a mapping on this source contribute nothing.
    pub fn map_from_source(
        &self,
        data: &Value,
        item_types: &[String],
        params: &Map<String, Value>,
        use_defaults: bool,
    ) -> Vec<Item> {
        item_types
            .iter()
            .filter_map(|item_type| {
                let mapping = self.mapping(item_type);
                if mapping.is_none() {
                    debug!(source = %self.id, %item_type, "No mapping for type");
                }
                mapping
            })
            .flat_map(|mapping| mapping.from_source(data, params, use_defaults))
            .collect()
    }

    /// Maps an item to this source's shape and serializes it. `None` when
    /// there is no item, no mapping for its type, or the mapping filters it
    /// out.
    pub fn map_to_source(&self, item: Option<&Item>) -> Option<Value> {
        let item = item?;
        let mapping = self.mapping(&item.item_type)?;
        let data = mapping.to_source(Some(item), None)?;
        Some(self.adapter.serialize(data, &mapping.path))
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.mappings.keys().collect();
        types.sort();
        f.debug_struct("Source")
            .field("id", &self.id)
            .field("auth", &self.auth.is_some())
            .field("endpoints", &self.endpoints.len())
            .field("mappings", &types)
            .finish()
    }
}

/// Read-only registry of sources keyed by id.
#[derive(Debug, Default)]
pub struct Sources {
    sources: HashMap<String, Arc<Source>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: Source) {
        self.sources.insert(source.id.clone(), Arc::new(source));
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Source>> {
        self.sources.get(id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Source>> {
        self.sources.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::{AttributeDef, Datatype};
    use crate::framework::mock::{MockAdapter, MockAuthenticator};
    use crate::model::Status;
    use serde_json::json;

    fn entry_source(adapter: Arc<dyn Adapter>) -> Source {
        let entry = Arc::new(Datatype::new("entry").with_attribute("title", AttributeDef::new("string")));
        let mapping = Mapping::new(entry)
            .with_path(Path::compile("data").unwrap())
            .map_attribute("id", Path::compile("key").unwrap(), None)
            .map_attribute("title", Path::compile("headline").unwrap(), None);
        Source::new("entries", adapter)
            .with_endpoint(Endpoint::new(Map::new()))
            .with_mapping(mapping)
    }

    fn request(source: &Source) -> Request {
        let mut params = Map::new();
        params.insert("type".into(), json!("entry"));
        source.prepare_request(RawRequest::new("GET", params), &Datatypes::new())
    }

    #[tokio::test]
    async fn auth_gate_adds_headers_after_authenticating() {
        let mock = MockAdapter::new();
        mock.expect_retrieve().return_ok(json!({}));
        let auth = Arc::new(MockAuthenticator::new(true).with_header("Authorization", "Bearer t0k3n"));
        let source = entry_source(Arc::new(mock.clone())).with_auth(auth.clone());

        let response = source.retrieve(request(&source)).await;

        assert_eq!(response.status, Status::Ok);
        assert!(auth.is_authenticated());
        let sent = mock.requests();
        assert_eq!(sent[0].headers["Authorization"], json!("Bearer t0k3n"));
        mock.verify();
    }

    #[tokio::test]
    async fn auth_gate_refuses_on_failed_authentication() {
        let mock = MockAdapter::new();
        let source =
            entry_source(Arc::new(mock.clone())).with_auth(Arc::new(MockAuthenticator::new(false)));

        let response = source.send(request(&source)).await;

        assert_eq!(response.status, Status::AuthError);
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn maps_both_directions_through_the_type_mapping() {
        let source = entry_source(Arc::new(MockAdapter::new()));
        let data = json!({"data": {"key": "ent1", "headline": "First"}});

        let items = source.map_from_source(&data, &["entry".into(), "user".into()], &Map::new(), false);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].attributes["title"], json!("First"));

        let serialized = source.map_to_source(Some(&items[0]));
        assert_eq!(serialized, Some(json!({"data": {"key": "ent1", "headline": "First"}})));

        let stranger = Item::new(Some("johnf".into()), "user");
        assert_eq!(source.map_to_source(Some(&stranger)), None);
        assert_eq!(source.map_to_source(None), None);
    }

    /// Extracts at whatever path it is handed.
    struct Extracting;

    #[async_trait::async_trait]
    impl Adapter for Extracting {
        async fn send(&self, _request: &Request) -> Envelope {
            Envelope::ok(Value::Null)
        }

        fn normalize(&self, data: Value, path: &Path) -> Value {
            path.get(&data)
        }
    }

    #[test]
    fn mapping_path_is_extracted_once() {
        let entry = Arc::new(Datatype::new("entry").with_attribute("title", AttributeDef::new("string")));
        let mapping = Mapping::new(entry)
            .with_path(Path::compile("data.items[]").unwrap())
            .map_attribute("id", Path::compile("key").unwrap(), None)
            .map_attribute("title", Path::compile("headline").unwrap(), None);
        let source = Source::new("entries", Arc::new(Extracting)).with_mapping(mapping);
        let body = json!({"data": {"items": [{"key": "ent1", "headline": "First"}]}});

        let data = source.normalize(body);
        let items = source.map_from_source(&data, &["entry".into()], &Map::new(), false);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("ent1"));
        assert_eq!(items[0].attributes["title"], json!("First"));
    }
}
