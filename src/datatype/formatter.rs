//! # Formatters
//!
//! A [`Formatter`] converts a value coming from a source into its canonical
//! form (`from_source`) and back (`to_source`). Formatters are looked up by
//! name: datatypes use the attribute's semantic type (`integer`, `date`, ...)
//! as the name, field mappers may name any registered formatter.
//!
//! Formatting never fails. A value that can't be converted becomes `null`.

use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Two-way value conversion between a source and the canonical form.
pub trait Formatter: Send + Sync {
    fn from_source(&self, value: Value) -> Value;

    /// Outbound conversion. Defaults to the identity.
    fn to_source(&self, value: Value) -> Value {
        value
    }
}

impl<F> Formatter for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn from_source(&self, value: Value) -> Value {
        self(value)
    }
}

/// Named registry of formatters. Starts with the built-in semantic types.
#[derive(Clone)]
pub struct Formatters {
    formatters: HashMap<String, Arc<dyn Formatter>>,
}

impl Formatters {
    /// An empty registry, without the built-in types.
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// The built-in semantic types: `string`, `integer`, `float`, `boolean`,
    /// `date` and `object`.
    pub fn builtin() -> Self {
        Self::empty()
            .with("string", StringFormatter)
            .with("integer", IntegerFormatter)
            .with("float", FloatFormatter)
            .with("boolean", BooleanFormatter)
            .with("date", DateFormatter)
            .with("object", |value: Value| value)
    }

    pub fn with(mut self, name: impl Into<String>, formatter: impl Formatter + 'static) -> Self {
        self.insert(name, Arc::new(formatter));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, formatter: Arc<dyn Formatter>) {
        self.formatters.insert(name.into(), formatter);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Formatter>> {
        self.formatters.get(name).cloned()
    }

    /// Runs the inbound conversion registered under `name`. Unknown names pass
    /// the value through untouched.
    pub fn cast(&self, name: &str, value: Value) -> Value {
        match self.formatters.get(name) {
            Some(formatter) => formatter.from_source(value),
            None => value,
        }
    }

    /// Merges `other` over `self`; entries in `other` win.
    pub fn merged(mut self, other: &Formatters) -> Self {
        for (name, formatter) in &other.formatters {
            self.formatters.insert(name.clone(), formatter.clone());
        }
        self
    }
}

impl Default for Formatters {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.formatters.keys().collect();
        names.sort();
        f.debug_struct("Formatters").field("names", &names).finish()
    }
}

struct StringFormatter;

impl Formatter for StringFormatter {
    fn from_source(&self, value: Value) -> Value {
        match value {
            Value::String(_) | Value::Null => value,
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            Value::Array(_) | Value::Object(_) => Value::Null,
        }
    }
}

struct IntegerFormatter;

impl Formatter for IntegerFormatter {
    fn from_source(&self, value: Value) -> Value {
        let parsed = match &value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(truncate)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(truncate))
            }
            _ => None,
        };
        parsed.map_or(Value::Null, |i| Value::Number(i.into()))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(f: f64) -> i64 {
    f.trunc() as i64
}

struct FloatFormatter;

impl Formatter for FloatFormatter {
    fn from_source(&self, value: Value) -> Value {
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

struct BooleanFormatter;

impl Formatter for BooleanFormatter {
    fn from_source(&self, value: Value) -> Value {
        match &value {
            Value::Bool(_) => value,
            Value::String(s) => match s.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::Null,
            },
            Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            _ => Value::Null,
        }
    }
}

/// Dates are canonicalized to RFC 3339 strings. Numbers are read as epoch
/// milliseconds.
struct DateFormatter;

impl Formatter for DateFormatter {
    fn from_source(&self, value: Value) -> Value {
        let instant = match &value {
            Value::String(s) => OffsetDateTime::parse(s, &Rfc3339).ok(),
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()),
            _ => None,
        };
        instant.map_or(Value::Null, format_date)
    }
}

/// Formats an instant the way the `date` type stores it.
pub fn format_date(instant: OffsetDateTime) -> Value {
    instant
        .format(&Rfc3339)
        .map_or(Value::Null, Value::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_parses_strings_and_truncates_floats() {
        let formatters = Formatters::builtin();
        assert_eq!(formatters.cast("integer", json!("36")), json!(36));
        assert_eq!(formatters.cast("integer", json!(3.9)), json!(3));
        assert_eq!(formatters.cast("integer", json!("old")), Value::Null);
    }

    #[test]
    fn date_accepts_iso_strings_and_epoch_millis() {
        let formatters = Formatters::builtin();
        assert_eq!(
            formatters.cast("date", json!(1_504_256_400_000_i64)),
            json!("2017-09-01T09:00:00Z")
        );
        assert_eq!(
            formatters.cast("date", json!("2017-09-01T11:00:00+02:00")),
            json!("2017-09-01T11:00:00+02:00")
        );
        assert_eq!(formatters.cast("date", json!({"when": "now"})), Value::Null);
    }

    #[test]
    fn unknown_type_passes_through() {
        let formatters = Formatters::builtin();
        assert_eq!(formatters.cast("geo", json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn closures_register_as_formatters() {
        let formatters = Formatters::builtin().with("integer", |v: Value| {
            json!(v.as_str().map_or(0, str::len))
        });
        assert_eq!(formatters.cast("integer", json!("four")), json!(4));
    }
}
