//! Dynamic value tree.
//!
//! `Value` is the untyped, arbitrarily nested structure the store owns:
//! maps, lists, and JSON-style primitives. Truthiness and string rendering
//! follow host-page conventions (empty string / zero / null are falsy,
//! null renders as the empty string).

use crate::{Path, Seg};
use std::collections::BTreeMap;

/// A dynamic value: the unit of state the store holds and templates render.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// An empty map, the default store root.
    pub fn empty_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy,
    /// everything else (including empty lists and maps) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) => true,
        }
    }

    /// `true` for maps and lists, which can be traversed into.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Render for template interpolation. Null renders as the empty string;
    /// integral numbers render without a fraction part.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => format_num(*n),
            Value::Str(s) => s.clone(),
            Value::List(_) | Value::Map(_) => self.to_json().to_string(),
        }
    }

    /// Look up one child by segment. Returns `None` for missing keys,
    /// out-of-range indices, and segment/shape mismatches.
    pub fn child(&self, seg: &Seg) -> Option<&Value> {
        match (self, seg) {
            (Value::Map(m), Seg::Key(k)) => m.get(k.as_str()),
            (Value::List(l), Seg::Index(i)) => l.get(*i),
            _ => None,
        }
    }

    /// Mutable child lookup.
    pub fn child_mut(&mut self, seg: &Seg) -> Option<&mut Value> {
        match (self, seg) {
            (Value::Map(m), Seg::Key(k)) => m.get_mut(k.as_str()),
            (Value::List(l), Seg::Index(i)) => l.get_mut(*i),
            _ => None,
        }
    }

    /// Traverse a whole path, short-circuiting to `None` the moment an
    /// intermediate value is missing or not traversable.
    pub fn traverse(&self, path: &Path) -> Option<&Value> {
        let mut cur = self;
        for seg in path.segs() {
            cur = cur.child(seg)?;
        }
        Some(cur)
    }

    // ── JSON bridge ───────────────────────────────────────────────

    /// Convert to a `serde_json::Value` (for persistence and logging).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Num(n) => {
                if n.fract() == 0.0
                    && n.is_finite()
                    && *n >= i64::MIN as f64
                    && *n <= i64::MAX as f64
                {
                    serde_json::Value::Number(serde_json::Number::from(*n as i64))
                } else {
                    serde_json::json!(*n)
                }
            }
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(fields) => {
                let mut map = serde_json::Map::new();
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    /// Build from a `serde_json::Value`. Non-finite numbers become null.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => Value::Num(f),
                None => Value::Null,
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                let mut fields = BTreeMap::new();
                for (k, v) in map {
                    fields.insert(k.clone(), Value::from_json(v));
                }
                Value::Map(fields)
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
