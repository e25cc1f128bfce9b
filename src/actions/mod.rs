//! # Built-in Actions
//!
//! Handlers for `GET`, `SET` and `DELETE`, and the default handler table they
//! make up. Every handler follows the same order:
//!
//! 1. validate the payload (no payload is `noaction`, a missing type is an
//!    `error`);
//! 2. check the datatype's access rule against the caller's ident;
//! 3. pick the source and prepare the request;
//! 4. talk to the source and map the data.

mod delete;
mod get;
mod set;

pub use delete::Delete;
pub use get::Get;
pub use set::Set;

use crate::framework::{HandlerTable, Resources};
use crate::model::{Access, AccessStatus, Action, Envelope};
use crate::source::{EndpointRef, RawRequest, Source};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

/// `GET`, `SET` and `DELETE`.
pub fn default_handlers() -> HandlerTable {
    HandlerTable::new()
        .with("GET", Get)
        .with("SET", Set)
        .with("DELETE", Delete)
}

/// Item types named by `payload.type`, a string or a list of strings.
fn payload_types(payload: &Value) -> Vec<String> {
    match payload.get("type") {
        Some(Value::String(item_type)) => vec![item_type.clone()],
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// The source an action targets, after the access check.
struct Target<'a> {
    source: &'a Arc<Source>,
    access: Access,
}

/// Checks the access rule of `item_type` against the caller's ident.
fn authorize(
    verb: &str,
    action: &Action,
    item_type: &str,
    resources: &Resources,
) -> Result<Access, Envelope> {
    let Some(datatype) = resources.datatypes.get(item_type) else {
        return Err(Envelope::error(format!("{verb}: Unknown type '{item_type}'")));
    };
    let access = datatype.access.authorize(action.ident());
    if access.status == AccessStatus::Refused {
        warn!(%verb, %item_type, ident = ?action.ident().and_then(|i| i.id.as_deref()), "Access refused");
        return Err(
            Envelope::auth_error(format!("{verb}: Access to '{item_type}' refused")).with_access(access),
        );
    }
    Ok(access)
}

/// Looks up the datatype, checks access and resolves the source from
/// `payload.source` or the datatype's default source.
fn target<'a>(
    verb: &str,
    action: &Action,
    item_type: &str,
    resources: &'a Resources,
) -> Result<Target<'a>, Envelope> {
    let access = authorize(verb, action, item_type, resources)?;
    let Some(datatype) = resources.datatypes.get(item_type) else {
        return Err(Envelope::error(format!("{verb}: Unknown type '{item_type}'")));
    };

    let source_id = action
        .payload_str("source")
        .or(datatype.source.as_deref());
    let Some(source_id) = source_id else {
        return Err(Envelope::error(format!("{verb}: No source for type '{item_type}'")).with_access(access));
    };
    let Some(source) = resources.sources.get(source_id) else {
        return Err(Envelope::error(format!("{verb}: Unknown source '{source_id}'")).with_access(access));
    };

    Ok(Target { source, access })
}

/// Params for the source request: `payload.params`, then `type` and `id`.
fn request_params(payload: &Value, item_type: &str) -> Map<String, Value> {
    let mut params = payload
        .get("params")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    params.insert("type".into(), Value::String(item_type.to_string()));
    if let Some(id) = payload.get("id").filter(|id| !id.is_null()) {
        params.insert("id".into(), id.clone());
    }
    params
}

/// A raw request carrying the payload's scope, endpoint and the caller's
/// ident.
fn raw_request(verb: &str, action: &Action, params: Map<String, Value>) -> RawRequest {
    let mut raw = RawRequest::new(verb, params);
    raw.scope = action.payload_str("scope").map(str::to_string);
    raw.endpoint = action.payload.get("endpoint").and_then(EndpointRef::from_value);
    raw.ident = action.ident().cloned();
    raw
}

fn no_endpoint(verb: &str, source: &Source) -> Envelope {
    warn!(%verb, source = %source.id, "No endpoint matching request");
    Envelope::error(format!("{verb}: No endpoint matching request to source '{}'", source.id))
}
