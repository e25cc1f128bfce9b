//! Qualifiers prune raw source nodes before they are mapped.
//!
//! Syntax: `path` (value is truthy), `!path` (value is falsy) or
//! `path=value` (value equals; the right-hand side is read as JSON when it
//! parses, as a string otherwise).

use super::path::Path;
use crate::error::PathError;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    path: Path,
    expected: Option<Value>,
    negate: bool,
}

impl Qualifier {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let (negate, raw) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (path, expected) = match raw.split_once('=') {
            Some((path, value)) => (
                path,
                Some(serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.into()))),
            ),
            None => (raw, None),
        };
        Ok(Self {
            path: Path::compile(path.trim())?,
            expected,
            negate,
        })
    }

    pub fn matches(&self, node: &Value) -> bool {
        let value = self.path.get(node);
        let hit = match &self.expected {
            Some(expected) => &value == expected,
            None => is_truthy(&value),
        };
        hit != self.negate
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compares_against_expected_value() {
        let qualifier = Qualifier::parse("meta.kind=entry").unwrap();
        assert!(qualifier.matches(&json!({"meta": {"kind": "entry"}})));
        assert!(!qualifier.matches(&json!({"meta": {"kind": "article"}})));

        let qualifier = Qualifier::parse("rank=3").unwrap();
        assert!(qualifier.matches(&json!({"rank": 3})));
    }

    #[test]
    fn checks_truthiness_and_negation() {
        assert!(Qualifier::parse("published").unwrap().matches(&json!({"published": true})));
        assert!(Qualifier::parse("!deleted").unwrap().matches(&json!({"title": "kept"})));
        assert!(!Qualifier::parse("!deleted").unwrap().matches(&json!({"deleted": 1})));
    }
}
