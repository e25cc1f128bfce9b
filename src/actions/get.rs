//! `GET`: fetch items from a source.
//!
//! Payload: `{type, id?, source?, params?, scope?, endpoint?, useDefaults?}`.
//! `type` may list several types; every one with a mapping on the source is
//! mapped from the same response.

use super::{authorize, no_endpoint, payload_types, raw_request, request_params, target};
use crate::framework::{ActionHandler, Resources};
use crate::model::{items_to_value, Action, Envelope};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

pub struct Get;

#[async_trait]
impl ActionHandler for Get {
    #[instrument(name = "get", skip_all)]
    async fn handle(&self, action: Action, resources: &Resources) -> Envelope {
        if action.payload.is_null() {
            debug!("GET without payload");
            return Envelope::no_action();
        }
        let types = payload_types(&action.payload);
        let Some(item_type) = types.first() else {
            return Envelope::error("GET: No type");
        };

        // Every listed type is mapped from the response, so every one must be readable.
        for other in &types[1..] {
            if let Err(envelope) = authorize("GET", &action, other, resources) {
                return envelope;
            }
        }
        let target = match target("GET", &action, item_type, resources) {
            Ok(target) => target,
            Err(envelope) => return envelope,
        };
        let (source, access) = (target.source, target.access);

        let id = action
            .payload
            .get("id")
            .filter(|id| !id.is_null())
            .map(|id| id.as_str().map_or_else(|| id.to_string(), str::to_string));
        let raw = raw_request("GET", &action, request_params(&action.payload, item_type));
        let request = source.prepare_request(raw, &resources.datatypes);
        if request.endpoint.is_none() {
            return no_endpoint("GET", source).with_access(access);
        }
        let params = request.params.clone();

        let response = source.retrieve(request).await;
        if !response.is_ok() {
            return response.with_access(access);
        }

        let data = source.normalize(response.data.unwrap_or(Value::Null));
        let use_defaults = action
            .payload
            .get("useDefaults")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let items = source.map_from_source(&data, &types, &params, use_defaults);

        if let Some(id) = id {
            if items.is_empty() {
                info!(source = %source.id, %id, "Not found");
                return Envelope::not_found(format!("Could not find item with id '{id}'"))
                    .with_access(access);
            }
        }
        info!(source = %source.id, count = items.len(), "Got items");
        Envelope::ok(items_to_value(&items)).with_access(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::{AccessRule, AttributeDef, Datatype, Datatypes};
    use crate::endpoint::Endpoint;
    use crate::framework::mock::MockAdapter;
    use crate::framework::{Dispatcher, HandlerTable};
    use crate::mapping::{Mapping, Path};
    use crate::model::{Ident, Status};
    use crate::source::{Source, Sources};
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn dispatcher(adapter: &MockAdapter, access: AccessRule) -> Dispatcher {
        let entry = Datatype::new("entry")
            .with_source("entries")
            .with_access(access)
            .with_attribute("title", AttributeDef::new("string"))
            .with_attribute("views", AttributeDef::new("integer").with_default(json!(0)));
        let mut datatypes = Datatypes::new();
        datatypes.insert(entry);
        let datatypes = Arc::new(datatypes);

        let mapping = Mapping::new(datatypes.get("entry").unwrap().clone())
            .with_path(Path::compile("items[]").unwrap())
            .map_attribute("id", Path::compile("key").unwrap(), None)
            .map_attribute("title", Path::compile("headline").unwrap(), None);
        let mut sources = Sources::new();
        sources.insert(
            Source::new("entries", Arc::new(adapter.clone()))
                .with_endpoint(Endpoint::new(Map::new()))
                .with_mapping(mapping),
        );

        Dispatcher::builder()
            .handlers(HandlerTable::new().with("GET", Get))
            .datatypes(datatypes)
            .sources(Arc::new(sources))
            .build()
    }

    #[tokio::test]
    async fn gets_and_casts_items() {
        let adapter = MockAdapter::new();
        adapter
            .expect_retrieve()
            .return_ok(json!({"items": [{"key": "ent1", "headline": "First"}]}));
        let dispatcher = dispatcher(&adapter, AccessRule::All);

        let envelope = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": "entry"}))))
            .await;

        assert_eq!(envelope.status, Status::Ok);
        let data = envelope.data.unwrap();
        assert_eq!(data[0]["id"], json!("ent1"));
        assert_eq!(data[0]["attributes"]["title"], json!("First"));
        assert_eq!(data[0]["attributes"]["views"], json!(0));
        adapter.verify();
    }

    #[tokio::test]
    async fn missing_id_is_notfound() {
        let adapter = MockAdapter::new();
        adapter.expect_retrieve().return_ok(json!({"items": []}));
        let dispatcher = dispatcher(&adapter, AccessRule::All);

        let envelope = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": "entry", "id": "ent404"}))))
            .await;

        assert_eq!(envelope.status, Status::NotFound);
        assert_eq!(adapter.requests()[0].params["id"], json!("ent404"));
    }

    #[tokio::test]
    async fn validates_payload_before_io() {
        let adapter = MockAdapter::new();
        let dispatcher = dispatcher(&adapter, AccessRule::All);

        let none = dispatcher.dispatch(Some(Action::new("GET", Value::Null))).await;
        let untyped = dispatcher.dispatch(Some(Action::new("GET", json!({})))).await;
        let unknown = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": "entry", "source": "nowhere"}))))
            .await;

        assert_eq!(none.status, Status::NoAction);
        assert_eq!(untyped.status, Status::Error);
        assert_eq!(unknown.status, Status::Error);
        assert!(adapter.requests().is_empty());
    }

    #[tokio::test]
    async fn refused_access_is_autherror() {
        let adapter = MockAdapter::new();
        let dispatcher = dispatcher(&adapter, AccessRule::Auth);

        let envelope = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": "entry"}))))
            .await;

        assert_eq!(envelope.status, Status::AuthError);
        assert!(adapter.requests().is_empty());

        adapter.expect_retrieve().return_ok(json!({"items": []}));
        let envelope = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": "entry"})).with_ident(Ident::new("johnf"))))
            .await;
        assert_eq!(envelope.status, Status::Ok);
        assert_eq!(envelope.access.and_then(|a| a.ident).and_then(|i| i.id).as_deref(), Some("johnf"));
    }

    #[tokio::test]
    async fn every_listed_type_is_access_checked() {
        let mut datatypes = Datatypes::new();
        datatypes.insert(
            Datatype::new("entry")
                .with_source("entries")
                .with_attribute("title", AttributeDef::new("string")),
        );
        datatypes.insert(
            Datatype::new("secret")
                .with_source("entries")
                .with_access(AccessRule::Auth)
                .with_attribute("title", AttributeDef::new("string")),
        );
        let datatypes = Arc::new(datatypes);
        let mapping = |item_type: &str| {
            Mapping::new(datatypes.get(item_type).unwrap().clone())
                .map_attribute("id", Path::compile("key").unwrap(), None)
                .map_attribute("title", Path::compile("headline").unwrap(), None)
        };
        let adapter = MockAdapter::new();
        let mut sources = Sources::new();
        sources.insert(
            Source::new("entries", Arc::new(adapter.clone()))
                .with_endpoint(Endpoint::new(Map::new()))
                .with_mapping(mapping("entry"))
                .with_mapping(mapping("secret")),
        );
        let dispatcher = Dispatcher::builder()
            .handlers(HandlerTable::new().with("GET", Get))
            .datatypes(datatypes.clone())
            .sources(Arc::new(sources))
            .build();

        let envelope = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": ["entry", "secret"]}))))
            .await;

        assert_eq!(envelope.status, Status::AuthError);
        assert!(envelope.data.is_none());
        assert!(adapter.requests().is_empty());

        adapter
            .expect_retrieve()
            .return_ok(json!([{"key": "s1", "headline": "Secret"}]));
        let envelope = dispatcher
            .dispatch(Some(
                Action::new("GET", json!({"type": ["entry", "secret"]})).with_ident(Ident::new("johnf")),
            ))
            .await;
        assert_eq!(envelope.status, Status::Ok);
        adapter.verify();
    }

    #[tokio::test]
    async fn passes_source_failures_through() {
        let adapter = MockAdapter::new();
        adapter.expect_retrieve().return_err(Status::Error, "Server down");
        let dispatcher = dispatcher(&adapter, AccessRule::All);

        let envelope = dispatcher
            .dispatch(Some(Action::new("GET", json!({"type": "entry"}))))
            .await;

        assert_eq!(envelope.status, Status::Error);
        assert_eq!(envelope.error.as_deref(), Some("Server down"));
    }
}
