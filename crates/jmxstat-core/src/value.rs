//! Attribute value model.
//!
//! Remote attributes arrive as loosely typed data (numbers, strings, composite
//! and tabular structures). [`AttributeValue`] is the closed set of shapes the
//! converters work with; [`Shape`] is the tag they dispatch on.

use std::fmt;

/// A single attribute value read from a managed resource.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// The attribute exists but has no value.
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arrays and other ordered collections.
    List(Vec<AttributeValue>),
    /// Associative values (composite data, tabular data, maps).
    ///
    /// Entries keep the order the remote side produced them in. Keys are
    /// values too: tabular data is keyed by composite rows.
    Map(Vec<(AttributeValue, AttributeValue)>),
}

/// Coarse shape of a value, used by converters to decide whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Absent,
    Scalar,
    Associative,
    Other,
}

impl AttributeValue {
    pub fn shape(&self) -> Shape {
        match self {
            AttributeValue::Null => Shape::Absent,
            AttributeValue::Bool(_)
            | AttributeValue::Integer(_)
            | AttributeValue::Float(_)
            | AttributeValue::Text(_) => Shape::Scalar,
            AttributeValue::Map(_) => Shape::Associative,
            AttributeValue::List(_) => Shape::Other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Builds a map value from `(key, value)` pairs, keeping their order.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<AttributeValue>,
        V: Into<AttributeValue>,
    {
        AttributeValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Generic text representation, used when no converter claims a value.
///
/// Maps print as `{k=v, k2=v2}` and lists as `[a, b]`.
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => Ok(()),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            // integral doubles print with a `.0` fraction
            AttributeValue::Float(x) if x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            AttributeValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i64::from(i))
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(AttributeValue::Null, Into::into)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;

        match v {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttributeValue::Integer(i)
                } else {
                    // u64 above i64::MAX and all non-integers
                    AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => AttributeValue::Text(s),
            Value::Array(items) => {
                AttributeValue::List(items.into_iter().map(AttributeValue::from).collect())
            }
            Value::Object(fields) => AttributeValue::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (AttributeValue::Text(k), AttributeValue::from(v)))
                    .collect(),
            ),
        }
    }
}
