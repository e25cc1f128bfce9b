//! `SET`: write items to a source.
//!
//! Payload: `{data, type?, source?, params?, endpoint?}` where `data` is an
//! item or a list of items. The type defaults to the first item's type.

use super::{no_endpoint, raw_request, request_params, target};
use crate::framework::{ActionHandler, Resources};
use crate::model::{Action, Envelope, Item};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub struct Set;

/// Reads payload items, filling in `item_type` where an item has no type.
fn payload_items(data: &Value, item_type: Option<&str>) -> Vec<Item> {
    let values = match data {
        Value::Array(values) => values.iter().collect(),
        value => vec![value],
    };
    values
        .into_iter()
        .filter_map(|value| {
            let mut value = value.clone();
            if let (Some(object), Some(item_type)) = (value.as_object_mut(), item_type) {
                object
                    .entry("type")
                    .or_insert_with(|| Value::String(item_type.to_string()));
            }
            let item = Item::from_value(&value);
            if item.is_none() {
                warn!(?value, "Skipping malformed item");
            }
            item
        })
        .collect()
}

#[async_trait]
impl ActionHandler for Set {
    #[instrument(name = "set", skip_all)]
    async fn handle(&self, action: Action, resources: &Resources) -> Envelope {
        let Some(data) = action.payload.get("data").filter(|data| !data.is_null()) else {
            debug!("SET without data");
            return Envelope::no_action();
        };
        let items = payload_items(data, action.payload_str("type"));
        let Some(item_type) = action
            .payload_str("type")
            .or_else(|| items.first().map(|item| item.item_type.as_str()))
        else {
            return Envelope::error("SET: No type");
        };

        let target = match target("SET", &action, item_type, resources) {
            Ok(target) => target,
            Err(envelope) => return envelope,
        };
        let (source, access) = (target.source, target.access);

        let mut mapped: Vec<Value> = items
            .iter()
            .filter_map(|item| source.map_to_source(Some(item)))
            .collect();
        if mapped.is_empty() {
            debug!(source = %source.id, "Nothing left to set");
            return Envelope::no_action().with_access(access);
        }
        let body = if data.is_array() {
            Value::Array(mapped)
        } else {
            mapped.remove(0)
        };

        let mut params = request_params(&action.payload, item_type);
        if let (false, [Item { id: Some(id), .. }]) = (params.contains_key("id"), items.as_slice()) {
            params.insert("id".into(), Value::String(id.clone()));
        }
        let mut raw = raw_request("SET", &action, params);
        raw.data = Some(body);
        let request = source.prepare_request(raw, &resources.datatypes);
        if request.endpoint.is_none() {
            return no_endpoint("SET", source).with_access(access);
        }

        let response = source.send(request).await;
        info!(source = %source.id, count = items.len(), status = %response.status, "Set items");
        response.with_access(access)
    }
}
