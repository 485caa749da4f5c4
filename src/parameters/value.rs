//! Dynamic values produced by parameter expressions
//!
//! Machine-profile expressions mix numbers, strings and booleans freely, and a
//! parameter that was never bound reads as `undefined`. This module provides the
//! `Value` type that carries those results along with the loose coercion rules
//! the expressions are written against.

use crate::parameters::expression::Builtin;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A value read from a context or produced by evaluating an expression
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value bound
    #[default]
    Undefined,

    /// Explicit null
    Null,

    /// Boolean value
    Bool(bool),

    /// Numeric value (integers are stored as `f64`)
    Number(f64),

    /// String value
    Str(String),

    /// Sequence of values, as returned by `extruderValues`
    List(Vec<Value>),

    /// A helper function or namespace exposed to expressions
    Builtin(Builtin),
}

impl Value {
    /// Returns true for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true for `undefined` and `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Get the number stored in this value, without coercion
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean stored in this value, without coercion
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string stored in this value, without coercion
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by `!`, `&&`, `||`, `?:` and visibility flags
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Builtin(_) => true,
        }
    }

    /// Numeric coercion
    ///
    /// `undefined` and unparsable strings become NaN, `null` and `false` become 0,
    /// and a single-element list coerces through its element.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined | Value::Builtin(_) => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::List(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
        }
    }

    /// Numeric view used for bounds: numbers and numeric strings only
    pub fn to_bound(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Str(_) => {
                let n = self.to_number();
                (!n.is_nan()).then_some(n)
            }
            _ => None,
        }
    }

    /// String coercion, as used by `+` when either operand is a string
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    /// Strict equality (`===`)
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            // Lists compare by identity in the host language; two separately
            // produced lists are never strictly equal.
            _ => false,
        }
    }

    /// Loose equality (`==`)
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(_), _) | (_, Value::List(_)) => {
                self.to_display_string() == other.to_display_string()
            }
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Relational comparison (`<`, `>`, ...)
    ///
    /// Two strings compare lexicographically, anything else numerically.
    /// Returns `None` when either side is NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }
}

/// Render a number the way the host language prints it
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Builtin(builtin) => write!(f, "function {}() {{ [native code] }}", builtin.name()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Undefined),
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            // Objects never appear as parameter values
            serde_json::Value::Object(_) => Value::Undefined,
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Undefined | Value::Null | Value::Builtin(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if is_integral(*n) => serializer.serialize_i64(*n as i64),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
        }
    }
}

/// Whether `n` is written as a JSON integer
fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(json))
    }
}
