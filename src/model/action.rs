//! # Actions
//!
//! An [`Action`] is the typed request that enters the system through
//! [`Dispatcher::dispatch`](crate::framework::Dispatcher::dispatch). It carries
//! a verb (`GET`, `SET`, ...), a JSON payload, the identity of the caller and an
//! optional queue directive.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// Identity attached to a dispatch call.
///
/// Handlers only read it for access decisions. It is never mutated by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl Ident {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Metadata travelling with an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub ident: Option<Ident>,
}

/// Request to defer an action instead of running it in the current call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDirective {
    /// Run as soon as possible, off the current call.
    Now,
    /// Run at (or after) the given instant.
    At(OffsetDateTime),
}

impl QueueDirective {
    /// Epoch milliseconds handed to the queue backend. `None` means "now".
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::Now => None,
            Self::At(instant) => {
                let millis = instant.unix_timestamp_nanos() / 1_000_000;
                Some(i64::try_from(millis).unwrap_or(i64::MAX))
            }
        }
    }
}

/// A typed request dispatched into the system.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: String,
    pub payload: Value,
    pub meta: Meta,
    pub queue: Option<QueueDirective>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            meta: Meta::default(),
            queue: None,
        }
    }

    pub fn with_ident(mut self, ident: Ident) -> Self {
        self.meta.ident = Some(ident);
        self
    }

    pub fn with_queue(mut self, directive: QueueDirective) -> Self {
        self.queue = Some(directive);
        self
    }

    pub fn ident(&self) -> Option<&Ident> {
        self.meta.ident.as_ref()
    }

    /// Returns the payload as an object, or `None` when the action carries no
    /// usable payload.
    pub fn payload_object(&self) -> Option<&serde_json::Map<String, Value>> {
        self.payload.as_object()
    }

    /// Reads a string field from the payload.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn scheduled_directive_reports_epoch_millis() {
        let directive = QueueDirective::At(datetime!(2017-09-01 09:00:00 UTC));
        assert_eq!(directive.timestamp(), Some(1_504_256_400_000));
        assert_eq!(QueueDirective::Now.timestamp(), None);
    }

    #[test]
    fn builder_sets_ident_and_queue() {
        let action = Action::new("SET", json!({}))
            .with_ident(Ident::new("johnf").with_roles(["editor"]))
            .with_queue(QueueDirective::Now);

        assert_eq!(action.ident().and_then(|i| i.id.as_deref()), Some("johnf"));
        assert!(action.ident().unwrap().has_role("editor"));
        assert_eq!(action.queue, Some(QueueDirective::Now));
    }
}
