//! # Status Envelope
//!
//! Every dispatched action resolves to an [`Envelope`]. Expected failures
//! (unknown source, missing payload field, refused access, ...) are reported
//! through [`Status`] and never surface as Rust errors.

use super::Ident;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Outcome of a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Queued,
    NoAction,
    NotFound,
    AuthError,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Queued => "queued",
            Self::NoAction => "noaction",
            Self::NotFound => "notfound",
            Self::AuthError => "autherror",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Granted,
    Refused,
}

/// Result of an access decision, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub status: AccessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<Ident>,
}

/// Uniform `{status, data?, error?, access?}` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
}

impl Envelope {
    /// An envelope with only a status.
    pub fn status(status: Status) -> Self {
        Self {
            status,
            data: None,
            error: None,
            access: None,
        }
    }

    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::status(Status::Ok)
        }
    }

    pub fn no_action() -> Self {
        Self::status(Status::NoAction)
    }

    pub fn queued() -> Self {
        Self::status(Status::Queued)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::failure(Status::Error, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(Status::NotFound, message)
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::failure(Status::AuthError, message)
    }

    fn failure(status: Status, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::status(status)
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = Some(access);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_without_empty_fields() {
        let value = serde_json::to_value(Envelope::no_action()).unwrap();
        assert_eq!(value, json!({"status": "noaction"}));

        let value = serde_json::to_value(Envelope::auth_error("Not allowed")).unwrap();
        assert_eq!(value, json!({"status": "autherror", "error": "Not allowed"}));
    }
}
