//! Leaf value conversions
//!
//! [`MapValue`] converts a single JSON node to and from a Rust value. Objects
//! are handled by [`Mappable`](crate::Mappable) instead.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// A leaf value that can be read from and written to a JSON node
pub trait MapValue: Sized {
    /// Shape name used in error messages
    const EXPECTED: &'static str;

    /// Read the value, `None` if the node has the wrong shape
    fn from_json(value: &Value) -> Option<Self>;

    /// Write the value
    fn to_json(&self) -> Value;
}

impl MapValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl MapValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl MapValue for i32 {
    const EXPECTED: &'static str = "32-bit integer";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|n| i32::try_from(n).ok())
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl MapValue for u32 {
    const EXPECTED: &'static str = "unsigned 32-bit integer";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|n| u32::try_from(n).ok())
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl MapValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl MapValue for String {
    const EXPECTED: &'static str = "string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl MapValue for Uuid {
    const EXPECTED: &'static str = "uuid string";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| Uuid::parse_str(s).ok())
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_string())
    }
}

/// Dates travel as RFC 3339 strings
impl MapValue for DateTime<Utc> {
    const EXPECTED: &'static str = "RFC 3339 date string";

    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_rfc3339())
    }
}

impl<T: MapValue> MapValue for Vec<T> {
    const EXPECTED: &'static str = "array";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_json).collect()
    }

    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(MapValue::to_json).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_reject_fractions() {
        assert_eq!(i64::from_json(&json!(7)), Some(7));
        assert_eq!(i64::from_json(&json!(7.5)), None);
    }

    #[test]
    fn i32_rejects_overflow() {
        assert_eq!(i32::from_json(&json!(i64::MAX)), None);
    }

    #[test]
    fn array_fails_on_any_bad_element() {
        assert_eq!(Vec::<i64>::from_json(&json!([1, 2, 3])), Some(vec![1, 2, 3]));
        assert_eq!(Vec::<i64>::from_json(&json!([1, "two"])), None);
    }

    #[test]
    fn uuid_as_string() {
        let id = Uuid::new_v4();
        let value = id.to_json();
        assert_eq!(Uuid::from_json(&value), Some(id));
    }

    #[test]
    fn dates_use_rfc3339() {
        let value = json!("2018-06-14T15:00:00Z");
        let date = DateTime::<Utc>::from_json(&value).unwrap();
        assert_eq!(date.timestamp(), 1_528_988_400);
    }
}
