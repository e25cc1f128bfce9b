//! # Paths
//!
//! Dot-separated paths into JSON values, compiled once at load time.
//!
//! - `data.items` walks object keys,
//! - `items[0]` picks an array element,
//! - `items[]` fans out over every element of an array: reading yields an
//!   array of the values found under each element, writing spreads an array
//!   over the elements.
//!
//! The empty string is the root path.

use crate::error::PathError;
use serde_json::{Map, Value};
use std::fmt;

/// Largest index a path may address. Writing pads arrays up to the index.
pub const MAX_INDEX: usize = 9_999;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Each,
}

/// A compiled path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    raw: String,
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn compile(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        if raw.is_empty() {
            return Ok(Self::root());
        }
        for part in raw.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            } else if rest.is_empty() {
                return Err(PathError::EmptySegment(raw.to_string()));
            }
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| PathError::UnclosedBracket(raw.to_string()))?;
                let inner = &rest[1..close];
                if inner.is_empty() {
                    segments.push(Segment::Each);
                } else {
                    let index = inner
                        .parse::<usize>()
                        .ok()
                        .filter(|index| *index <= MAX_INDEX)
                        .ok_or_else(|| PathError::InvalidIndex {
                            path: raw.to_string(),
                            index: inner.to_string(),
                        })?;
                    segments.push(Segment::Index(index));
                }
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(PathError::UnclosedBracket(raw.to_string()));
                }
            }
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Reads the value at this path. Missing values read as `null`.
    pub fn get(&self, node: &Value) -> Value {
        get_at(&self.segments, node).unwrap_or(Value::Null)
    }

    /// Writes `value` at this path, creating intermediate objects and arrays.
    pub fn set(&self, target: &mut Value, value: Value) {
        set_at(&self.segments, target, value);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn get_at(segments: &[Segment], node: &Value) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(node.clone());
    };
    match head {
        Segment::Key(key) => node.get(key).and_then(|next| get_at(rest, next)),
        Segment::Index(index) => node.get(index).and_then(|next| get_at(rest, next)),
        Segment::Each => match node {
            Value::Array(values) => Some(Value::Array(
                values
                    .iter()
                    .filter_map(|v| get_at(rest, v))
                    .filter(|v| !v.is_null())
                    .collect(),
            )),
            Value::Null => None,
            single => get_at(rest, single).map(|v| Value::Array(vec![v])),
        },
    }
}

fn set_at(segments: &[Segment], target: &mut Value, value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    match head {
        Segment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(obj) = target {
                let slot = obj.entry(key.clone()).or_insert(Value::Null);
                set_at(rest, slot, value);
            }
        }
        Segment::Index(index) => with_array(target, index + 1, |slots| {
            set_at(rest, &mut slots[*index], value);
        }),
        Segment::Each => {
            let values = match value {
                Value::Array(values) => values,
                Value::Null => Vec::new(),
                single => vec![single],
            };
            if rest.is_empty() {
                *target = Value::Array(values);
                return;
            }
            with_array(target, values.len(), |slots| {
                for (slot, value) in slots.iter_mut().zip(values) {
                    set_at(rest, slot, value);
                }
            });
        }
    }
}

/// Runs `f` on `target` as an array of at least `len` slots. Non-array
/// targets are replaced.
fn with_array(target: &mut Value, len: usize, f: impl FnOnce(&mut Vec<Value>)) {
    let mut slots = match std::mem::take(target) {
        Value::Array(values) => values,
        _ => Vec::new(),
    };
    if slots.len() < len {
        slots.resize(len, Value::Null);
    }
    f(&mut slots);
    *target = Value::Array(slots);
}
