//! Requests handed to adapters, and how they are prepared.

use super::adapter::Adapter;
use super::auth::Authenticator;
use crate::datatype::Datatypes;
use crate::endpoint::{self, Endpoint, EndpointQuery};
use crate::model::Ident;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// How a raw request names its endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointRef {
    /// An endpoint id declared on the source.
    Id(String),
    /// An endpoint definition given inline, run through
    /// [`Adapter::prepare_endpoint`].
    Inline(Value),
}

impl EndpointRef {
    /// Reads a payload `endpoint` field: a string is an id, an object an
    /// inline definition.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(id) => Some(Self::Id(id.clone())),
            Value::Object(_) => Some(Self::Inline(value.clone())),
            _ => None,
        }
    }
}

/// A request as built by a handler, before endpoint resolution.
#[derive(Clone, Default)]
pub struct RawRequest {
    pub action: String,
    pub params: Map<String, Value>,
    pub scope: Option<String>,
    pub endpoint: Option<EndpointRef>,
    pub headers: Map<String, Value>,
    pub auth: Option<Arc<dyn Authenticator>>,
    pub ident: Option<Ident>,
    pub data: Option<Value>,
}

impl RawRequest {
    pub fn new(action: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            action: action.into(),
            params,
            ..Self::default()
        }
    }
}

/// A request ready for an adapter.
#[derive(Clone)]
pub struct Request {
    pub action: String,
    pub data: Option<Value>,
    /// Options of the resolved endpoint. `None` when nothing matched.
    pub endpoint: Option<Map<String, Value>>,
    pub params: Map<String, Value>,
    pub headers: Map<String, Value>,
    pub auth: Option<Arc<dyn Authenticator>>,
    pub ident: Option<Ident>,
}

/// Source-level context for [`prepare_request`].
pub struct PrepareContext<'a> {
    pub endpoints: &'a [Endpoint],
    pub datatypes: &'a Datatypes,
    pub auth: Option<&'a Arc<dyn Authenticator>>,
    pub adapter: &'a dyn Adapter,
}

/// Completes a raw request.
///
/// - The endpoint comes from the inline definition, the named id or the
///   resolver, in that order of precedence.
/// - `typePlural` and `ident` are added to params unless the request already
///   sets them.
/// - The request's own auth wins over the source's.
pub fn prepare_request(raw: RawRequest, ctx: &PrepareContext<'_>) -> Request {
    let RawRequest {
        action,
        params: raw_params,
        scope,
        endpoint,
        headers,
        auth,
        ident,
        data,
    } = raw;

    let item_type = raw_params.get("type").and_then(Value::as_str);
    let mut params = Map::new();
    if let Some(item_type) = item_type {
        params.insert("typePlural".into(), Value::String(ctx.datatypes.plural_of(item_type)));
    }
    if let Some(id) = ident.as_ref().and_then(|i| i.id.clone()) {
        params.insert("ident".into(), Value::String(id));
    }
    params.extend(raw_params);

    let endpoint = match endpoint {
        Some(EndpointRef::Inline(definition)) => Some(ctx.adapter.prepare_endpoint(&definition)),
        Some(EndpointRef::Id(id)) => {
            endpoint::find_by_id(ctx.endpoints, &id).map(|e| e.options.clone())
        }
        None => {
            let query = EndpointQuery::new(Some(&action), params.clone(), scope.as_deref());
            endpoint::resolve(ctx.endpoints, &query).map(|e| e.options.clone())
        }
    };

    Request {
        action,
        data,
        endpoint,
        params,
        headers,
        auth: auth.or_else(|| ctx.auth.cloned()),
        ident,
    }
}

impl fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRequest")
            .field("action", &self.action)
            .field("params", &self.params)
            .field("scope", &self.scope)
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth.is_some())
            .finish()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("action", &self.action)
            .field("endpoint", &self.endpoint)
            .field("params", &self.params)
            .field("headers", &self.headers)
            .field("auth", &self.auth.is_some())
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::Datatype;
    use crate::model::Envelope;
    use async_trait::async_trait;
    use serde_json::json;

    struct Plain;

    #[async_trait]
    impl Adapter for Plain {
        async fn send(&self, _request: &Request) -> Envelope {
            Envelope::no_action()
        }

        fn prepare_endpoint(&self, definition: &Value) -> Map<String, Value> {
            let mut options = definition.as_object().cloned().unwrap_or_default();
            options.insert("prepared".into(), json!(true));
            options
        }
    }

    fn options(uri: &str) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("uri".into(), json!(uri));
        options
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn endpoints() -> Vec<Endpoint> {
        vec![
            Endpoint::new(options("http://api.test/entries")).with_scope("collection"),
            Endpoint::new(options("http://api.test/entries/{id}"))
                .with_id("one")
                .with_scope("member"),
        ]
    }

    fn datatypes() -> Datatypes {
        let mut datatypes = Datatypes::new();
        datatypes.insert(Datatype::new("entry").with_plural("entries"));
        datatypes
    }

    #[test]
    fn completes_params_and_resolves_endpoint() {
        let (endpoints, datatypes) = (endpoints(), datatypes());
        let ctx = PrepareContext {
            endpoints: &endpoints,
            datatypes: &datatypes,
            auth: None,
            adapter: &Plain,
        };
        let mut raw = RawRequest::new("GET", params(json!({"type": "entry", "id": "ent1"})));
        raw.ident = Some(Ident::new("johnf"));

        let request = prepare_request(raw, &ctx);

        assert_eq!(request.params["typePlural"], json!("entries"));
        assert_eq!(request.params["ident"], json!("johnf"));
        assert_eq!(request.params["id"], json!("ent1"));
        assert_eq!(request.endpoint, Some(options("http://api.test/entries/{id}")));
        assert!(request.headers.is_empty());
        assert!(request.auth.is_none());
    }

    #[test]
    fn unknown_type_gets_default_plural() {
        let (endpoints, datatypes) = (endpoints(), datatypes());
        let ctx = PrepareContext {
            endpoints: &endpoints,
            datatypes: &datatypes,
            auth: None,
            adapter: &Plain,
        };
        let request = prepare_request(RawRequest::new("GET", params(json!({"type": "user"}))), &ctx);

        assert_eq!(request.params["typePlural"], json!("users"));
        assert!(!request.params.contains_key("ident"));
    }

    #[test]
    fn named_and_inline_endpoints_bypass_the_resolver() {
        let (endpoints, datatypes) = (endpoints(), datatypes());
        let ctx = PrepareContext {
            endpoints: &endpoints,
            datatypes: &datatypes,
            auth: None,
            adapter: &Plain,
        };

        let mut raw = RawRequest::new("GET", params(json!({"type": "entry"})));
        raw.endpoint = Some(EndpointRef::Id("one".into()));
        let request = prepare_request(raw, &ctx);
        assert_eq!(request.endpoint, Some(options("http://api.test/entries/{id}")));

        let mut raw = RawRequest::new("GET", params(json!({"type": "entry"})));
        raw.endpoint = Some(EndpointRef::Inline(json!({"uri": "http://other.test"})));
        let request = prepare_request(raw, &ctx);
        assert_eq!(request.endpoint.as_ref().map(|e| e["prepared"].clone()), Some(json!(true)));

        let mut raw = RawRequest::new("GET", params(json!({"type": "entry"})));
        raw.endpoint = Some(EndpointRef::Id("missing".into()));
        assert_eq!(prepare_request(raw, &ctx).endpoint, None);
    }
}
