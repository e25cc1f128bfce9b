//! # Endpoint Resolver
//!
//! A source declares a list of [`Endpoint`]s. Each one says which requests it
//! can serve (by item type, scope and action) and which params it needs.
//! [`resolve`] picks the single most specific endpoint for a request.
//!
//! ## Resolution
//!
//! 1. Keep the endpoints whose declared matchers all contain the request's
//!    value and whose required params are all present.
//! 2. Order the survivors with [`compare_endpoints`] using a stable sort.
//! 3. The first one wins.

mod compare;

pub use compare::compare_endpoints;

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Restriction on one request dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Matcher {
    /// Not declared. Matches everything.
    #[default]
    Any,
    One(String),
    Many(Vec<String>),
}

impl Matcher {
    pub fn is_declared(&self) -> bool {
        !matches!(self, Self::Any)
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// A declared matcher needs a value to match against.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::One(expected), Some(value)) => expected == value,
            (Self::Many(expected), Some(value)) => expected.iter().any(|e| e == value),
            (_, None) => false,
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<String>> for Matcher {
    /// Empty lists declare nothing; a single entry is a scalar matcher.
    fn from(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => Self::Any,
            1 => Self::One(values.remove(0)),
            _ => Self::Many(values),
        }
    }
}

/// One way of talking to a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Endpoint {
    pub id: Option<String>,
    pub item_type: Matcher,
    pub scope: Matcher,
    pub action: Matcher,
    /// `true` marks a required param, `false` an optional one.
    pub params: BTreeMap<String, bool>,
    /// Adapter specific options (uri, method, ...) merged into the request.
    pub options: Map<String, Value>,
}

impl Endpoint {
    pub fn new(options: Map<String, Value>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, matcher: impl Into<Matcher>) -> Self {
        self.item_type = matcher.into();
        self
    }

    pub fn with_scope(mut self, matcher: impl Into<Matcher>) -> Self {
        self.scope = matcher.into();
        self
    }

    pub fn with_action(mut self, matcher: impl Into<Matcher>) -> Self {
        self.action = matcher.into();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, required: bool) -> Self {
        self.params.insert(name.into(), required);
        self
    }

    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|(_, required)| **required)
            .map(|(name, _)| name.as_str())
    }

    /// Optional params of this endpoint that the request actually carries.
    pub fn matched_optional_params(&self, params: &Map<String, Value>) -> usize {
        self.params
            .iter()
            .filter(|(name, required)| !**required && has_param(params, name))
            .count()
    }

    pub fn is_compatible(&self, query: &EndpointQuery) -> bool {
        self.item_type.matches(query.item_type.as_deref())
            && self.scope.matches(Some(&query.scope))
            && self.action.matches(query.action.as_deref())
            && self
                .required_params()
                .all(|name| has_param(&query.params, name))
    }
}

fn has_param(params: &Map<String, Value>, name: &str) -> bool {
    params.get(name).is_some_and(|value| !value.is_null())
}

/// The request-side view used for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointQuery {
    pub item_type: Option<String>,
    pub scope: String,
    pub action: Option<String>,
    pub params: Map<String, Value>,
}

impl EndpointQuery {
    /// Builds a query from request params. The item type is read from
    /// `params.type`. Without an explicit scope, a request carrying `params.id`
    /// targets a `member`, anything else the `collection`.
    pub fn new(action: Option<&str>, params: Map<String, Value>, scope: Option<&str>) -> Self {
        let scope = match scope {
            Some(scope) => scope.to_string(),
            None if has_param(&params, "id") => "member".to_string(),
            None => "collection".to_string(),
        };
        Self {
            item_type: params.get("type").and_then(Value::as_str).map(str::to_string),
            scope,
            action: action.map(str::to_string),
            params,
        }
    }
}

/// Picks the most specific compatible endpoint, or `None` when nothing
/// matches.
pub fn resolve<'a>(endpoints: &'a [Endpoint], query: &EndpointQuery) -> Option<&'a Endpoint> {
    let mut candidates: Vec<&Endpoint> = endpoints
        .iter()
        .filter(|endpoint| endpoint.is_compatible(query))
        .collect();
    candidates.sort_by(|a, b| compare_endpoints(a, b, &query.params));

    let chosen = candidates.first().copied();
    debug!(
        candidates = candidates.len(),
        endpoint = ?chosen.and_then(|e| e.id.as_deref()),
        "Resolved endpoint"
    );
    chosen
}

/// Looks an endpoint up by id.
pub fn find_by_id<'a>(endpoints: &'a [Endpoint], id: &str) -> Option<&'a Endpoint> {
    endpoints.iter().find(|e| e.id.as_deref() == Some(id))
}
