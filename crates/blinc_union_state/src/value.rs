//! Field values
//!
//! A [`Value`] is what a single state field holds. Scalars and strings are
//! compared by content; lists and objects are shared behind an `Arc` and are
//! compared by *identity* when the controller diffs state. Replacing a nested
//! object therefore always counts as a change, even if the new object happens
//! to hold the same fields.
//!
//! `PartialEq` is the structural (deep) comparison and is only meant for
//! assertions. The controller itself uses [`Value::strict_eq`].

use crate::record::Record;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// A single state field value
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Field not provided. Never overrides another value when merging.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<[Value]>),
    Object(Arc<Record>),
}

impl Value {
    /// Wrap a record as a shared nested object
    pub fn object(record: Record) -> Self {
        Value::Object(Arc::new(record))
    }

    /// Wrap values as a shared list
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Strict comparison: content for scalars and strings, identity for
    /// lists and objects
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // Only integral floats that round-trip exactly match an integer
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                b.fract() == 0.0 && (*a as f64) == *b && (*b as i64) == *a
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Check if this is the absent sentinel
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Check if this value was provided (anything but [`Value::Absent`])
    pub fn is_defined(&self) -> bool {
        !self.is_absent()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(record) => Some(record),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value.into())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Absent, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.into()),
            serde_json::Value::Array(items) => Value::list(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Absent | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::List(items) => items.iter().map(serde_json::Value::from).collect(),
            Value::Object(record) => serde_json::Value::Object(
                record
                    .iter()
                    .filter(|(_, v)| v.is_defined())
                    .map(|(k, v)| (k.to_owned(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Absent | Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items.iter()),
            Value::Object(record) => Record::serialize(record, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn test_scalars_compare_by_content() {
        assert!(Value::from("Zdzicho").strict_eq(&Value::from(String::from("Zdzicho"))));
        assert!(Value::from(25).strict_eq(&Value::from(25i64)));
        assert!(!Value::from(25).strict_eq(&Value::from(26)));
        assert!(!Value::from(25).strict_eq(&Value::from("25")));
        assert!(Value::Absent.strict_eq(&Value::Absent));
        assert!(!Value::Absent.strict_eq(&Value::Null));
    }

    #[test]
    fn test_int_float_match_only_when_exact() {
        assert!(Value::Int(25).strict_eq(&Value::Float(25.0)));
        assert!(Value::Float(25.0).strict_eq(&Value::Int(25)));
        assert!(!Value::Int(25).strict_eq(&Value::Float(25.5)));

        let rounded = Value::Float(i64::MAX as f64);
        let max = Value::Int(i64::MAX);
        let below_max = Value::Int(i64::MAX - 1);
        assert!(!max.strict_eq(&below_max));
        // The rounded float cannot stand in for both neighbours
        assert!(!below_max.strict_eq(&rounded));
    }

    #[test]
    fn test_nan_is_not_strictly_equal_to_itself() {
        let nan = Value::Float(f64::NAN);
        assert!(!nan.strict_eq(&nan.clone()));
    }

    #[test]
    fn test_objects_compare_by_identity() {
        let country = Value::object(record! { "name" => "Poland" });
        let same = country.clone();
        let lookalike = Value::object(record! { "name" => "Poland" });

        assert!(country.strict_eq(&same));
        assert!(!country.strict_eq(&lookalike));
        // Structural equality still sees them as equal
        assert_eq!(country, lookalike);
    }

    #[test]
    fn test_lists_compare_by_identity() {
        let tags = Value::list([Value::from("a"), Value::from("b")]);
        let lookalike = Value::list([Value::from("a"), Value::from("b")]);

        assert!(tags.strict_eq(&tags.clone()));
        assert!(!tags.strict_eq(&lookalike));
    }

    #[test]
    fn test_option_maps_none_to_absent() {
        assert!(Value::from(None::<i64>).is_absent());
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::from(serde_json::json!({
            "firstName": "Heniu",
            "age": 25,
            "height": 1.8,
            "tags": ["a", null],
        }));

        let record = value.as_object().expect("object");
        assert_eq!(record.get("firstName").and_then(Value::as_str), Some("Heniu"));
        assert_eq!(record.get("age").and_then(Value::as_i64), Some(25));
        assert_eq!(record.get("height").and_then(Value::as_f64), Some(1.8));
        assert_eq!(
            record.get("tags").and_then(Value::as_list),
            Some(&[Value::from("a"), Value::Null][..])
        );
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let value = Value::object(record! {
            "firstName" => "Heniu",
            "lastName" => Value::Absent,
        });

        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(json, serde_json::json!({ "firstName": "Heniu" }));
    }
}
