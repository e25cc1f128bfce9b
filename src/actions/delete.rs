//! `DELETE`: remove items from a source.
//!
//! Payload: `{type, id?, data?, source?, params?, endpoint?}`. The items to
//! delete are read from `data` (items or bare ids) or, without data, from
//! `id`. The source gets a list of `{id, type}` references.

use super::{no_endpoint, raw_request, request_params, target};
use crate::framework::{ActionHandler, Resources};
use crate::model::{Action, Envelope, Ref};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument};

pub struct Delete;

fn reference(value: &Value, item_type: &str) -> Option<Ref> {
    match value {
        Value::String(id) => Some(Ref::new(id.clone(), item_type)),
        Value::Number(id) => Some(Ref::new(id.to_string(), item_type)),
        Value::Object(object) => {
            let id = reference(object.get("id")?, item_type)?.id;
            let ref_type = object
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(item_type);
            Some(Ref::new(id, ref_type))
        }
        _ => None,
    }
}

fn references(payload: &Value, item_type: &str) -> Vec<Ref> {
    match payload.get("data").or_else(|| payload.get("id")) {
        Some(Value::Array(values)) => values.iter().filter_map(|v| reference(v, item_type)).collect(),
        Some(value) => reference(value, item_type).into_iter().collect(),
        None => Vec::new(),
    }
}

#[async_trait]
impl ActionHandler for Delete {
    #[instrument(name = "delete", skip_all)]
    async fn handle(&self, action: Action, resources: &Resources) -> Envelope {
        if action.payload.is_null() {
            return Envelope::no_action();
        }
        let Some(item_type) = action.payload_str("type") else {
            return Envelope::error("DELETE: No type");
        };
        let refs = references(&action.payload, item_type);
        if refs.is_empty() {
            debug!(%item_type, "Nothing to delete");
            return Envelope::no_action();
        }

        let target = match target("DELETE", &action, item_type, resources) {
            Ok(target) => target,
            Err(envelope) => return envelope,
        };
        let (source, access) = (target.source, target.access);

        let mut params = request_params(&action.payload, item_type);
        if let [only] = refs.as_slice() {
            params
                .entry("id")
                .or_insert_with(|| Value::String(only.id.clone()));
        }
        let mut raw = raw_request("DELETE", &action, params);
        raw.data = Some(Value::Array(
            refs.iter()
                .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
                .collect(),
        ));
        let request = source.prepare_request(raw, &resources.datatypes);
        if request.endpoint.is_none() {
            return no_endpoint("DELETE", source).with_access(access);
        }

        let response = source.send(request).await;
        info!(source = %source.id, count = refs.len(), status = %response.status, "Deleted items");
        response.with_access(access)
    }
}
