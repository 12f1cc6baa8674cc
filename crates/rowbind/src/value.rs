//! Cell values and rows.
//!
//! [`Value`] is the vendor-neutral representation of a single cell. It is what
//! drivers decode into, what records buffer, and what the SQL encoder renders as
//! a literal. [`Row`] is an ordered `field -> Value` map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single SQL value.
///
/// `Bool(false)` has a second meaning inside key tuples and equality filters:
/// it marks a column as unconstrained, and the predicate builder skips it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl Value {
    /// Whether the value renders as an unquoted numeric literal.
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Int(_) => true,
            Value::Float(f) => f.is_finite(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `Bool(false)`: the "no constraint" sentinel of key tuples and filters.
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Convert into a JSON value through the `Serialize` impl.
    ///
    /// Blobs become arrays of bytes. NaN and infinite floats have no JSON
    /// form and become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One row: field names mapped to values, in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Insert or overwrite a field, keeping its original position if present.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.shift_remove(field)
    }

    /// Field names in column order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` onto this row; fields in `other` win.
    pub fn merge(&mut self, other: &Row) {
        for (field, value) in other.iter() {
            self.values.insert(field.to_string(), value.clone());
        }
    }

    /// Convert into a JSON object, with cells converted as by [`Value::to_json`].
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_detection() {
        assert!(Value::from(5).is_numeric());
        assert!(Value::from(2.5).is_numeric());
        assert!(!Value::Float(f64::NAN).is_numeric());
        assert!(!Value::from("5").is_numeric());
        assert!(!Value::Null.is_numeric());
        assert!(!Value::from(true).is_numeric());
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn row_keeps_column_order_and_merges() {
        let mut row: Row = [("id", Value::from(1)), ("name", Value::from("Ada"))]
            .into_iter()
            .collect();
        let patch: Row = [("name", "Grace"), ("email", "g@example.com")]
            .into_iter()
            .collect();
        row.merge(&patch);

        assert_eq!(row.fields().collect::<Vec<_>>(), ["id", "name", "email"]);
        assert_eq!(row.get("name"), Some(&Value::from("Grace")));
    }

    #[test]
    fn row_serializes_as_object() {
        let row: Row = [("id", Value::from(7)), ("note", Value::Null)]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":7,"note":null}"#
        );
        assert_eq!(row.to_json(), serde_json::json!({"id": 7, "note": null}));
    }

    #[test]
    fn json_conversion_follows_serialize() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(Value::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
        assert_eq!(Value::Float(2.5).to_json(), serde_json::json!(2.5));
        assert_eq!(Value::Blob(vec![0, 255]).to_json(), serde_json::json!([0, 255]));
        assert_eq!(Value::from(true).to_json(), serde_json::json!(true));

        let row: Row = [
            ("ratio", Value::Float(f64::NEG_INFINITY)),
            ("raw", Value::Blob(vec![1])),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.to_json(), serde_json::json!({"ratio": null, "raw": [1]}));
        for (field, value) in row.iter() {
            assert_eq!(row.to_json()[field], value.to_json());
        }
    }

    #[test]
    fn untagged_deserialize_picks_natural_variant() {
        let v: Value = serde_json::from_str("42").unwrap();
        assert_eq!(v, Value::Int(42));
        let v: Value = serde_json::from_str("\"hi\"").unwrap();
        assert_eq!(v, Value::Text("hi".to_string()));
        let v: Value = serde_json::from_str("null").unwrap();
        assert_eq!(v, Value::Null);
    }
}
