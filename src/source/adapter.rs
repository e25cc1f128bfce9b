//! The adapter boundary: everything that actually talks to a remote service.

use super::request::Request;
use crate::mapping::Path;
use crate::model::Envelope;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Wire-level collaborator of a [`Source`](super::Source).
///
/// Adapters turn failures into envelopes themselves; nothing here returns a
/// `Result`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Fetches data. Defaults to [`send`](Adapter::send).
    async fn retrieve(&self, request: &Request) -> Envelope {
        self.send(request).await
    }

    async fn send(&self, request: &Request) -> Envelope;

    /// Unwraps a response body into the shape mappings read from, starting
    /// at `path`. Sources call this with the root path; mappings extract
    /// their own paths from the result.
    fn normalize(&self, data: Value, _path: &Path) -> Value {
        data
    }

    /// Turns an inline endpoint definition into endpoint options.
    fn prepare_endpoint(&self, definition: &Value) -> Map<String, Value> {
        definition.as_object().cloned().unwrap_or_default()
    }

    /// Wraps mapped data for sending. Data is placed at `path`.
    fn serialize(&self, data: Value, path: &Path) -> Value {
        if path.is_root() {
            return data;
        }
        let mut target = Value::Object(Map::new());
        path.set(&mut target, data);
        target
    }
}
