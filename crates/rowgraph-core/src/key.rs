//! Hashable keys derived from column values.
//!
//! `Value` carries floats and JSON, so it cannot be `Eq + Hash` directly.
//! `KeyValue` wraps a value with a structural equality (floats compared by bit
//! pattern) and a matching hash, which makes it usable as a map key for identity
//! keys, collection keys and result-container index keys.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A `Value` usable as a hash-map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue(pub Value);

impl KeyValue {
    /// Key for an integer position (appended collection or result elements).
    pub fn position(index: usize) -> Self {
        KeyValue(Value::BigInt(i64::try_from(index).unwrap_or(i64::MAX)))
    }

    /// Key for a named entry (scalar select items in a mixed tuple).
    pub fn name(name: impl Into<String>) -> Self {
        KeyValue(Value::Text(name.into()))
    }

    /// Borrow the wrapped value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The integer behind this key, if it is one.
    pub fn as_position(&self) -> Option<i64> {
        match &self.0 {
            Value::Bool(_) => None,
            other => other.as_i64(),
        }
    }
}

impl From<Value> for KeyValue {
    fn from(value: Value) -> Self {
        KeyValue(value)
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        values_equal(&self.0, &other.0)
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

/// Hash a value with a per-variant tag so `Int(1)` and `BigInt(1)` stay distinct.
fn hash_value<H: Hasher>(v: &Value, hasher: &mut H) {
    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::TinyInt(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::SmallInt(i) => {
            3u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Int(i) => {
            4u8.hash(hasher);
            i.hash(hasher);
        }
        Value::BigInt(i) => {
            5u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Float(f) => {
            6u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Double(f) => {
            7u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            8u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            9u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            10u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Date(d) => {
            11u8.hash(hasher);
            d.hash(hasher);
        }
        Value::Time(t) => {
            12u8.hash(hasher);
            t.hash(hasher);
        }
        Value::Timestamp(ts) => {
            13u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::TimestampTz(ts) => {
            14u8.hash(hasher);
            ts.hash(hasher);
        }
        Value::Uuid(u) => {
            15u8.hash(hasher);
            u.hash(hasher);
        }
        Value::Json(j) => {
            16u8.hash(hasher);
            j.to_string().hash(hasher);
        }
        Value::Array(arr) => {
            17u8.hash(hasher);
            arr.len().hash(hasher);
            for item in arr {
                hash_value(item, hasher);
            }
        }
    }
}

/// Composite identity of one logical entity within a result set.
///
/// Built from the identifier column values of an alias in the current row.
/// A key whose parts are all NULL collapses to the empty key, which means the
/// alias is absent from the row (typically an outer-join miss).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey(Vec<KeyValue>);

impl IdentityKey {
    /// The empty key (alias absent).
    pub fn absent() -> Self {
        Self(Vec::new())
    }

    /// Build a key from identifier values in identifier declaration order.
    pub fn from_parts(parts: Vec<Value>) -> Self {
        if parts.iter().all(Value::is_null) {
            return Self::absent();
        }
        Self(parts.into_iter().map(KeyValue).collect())
    }

    /// Whether the alias carried no identity in this row.
    pub fn is_absent(&self) -> bool {
        self.0.is_empty()
    }

    /// The key parts.
    pub fn parts(&self) -> &[KeyValue] {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}
