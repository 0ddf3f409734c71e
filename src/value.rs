//! A JSON value of any shape
//!
//! [`Value`] is the target to parse into when the shape of the document is
//! not known ahead of time. Strings and object keys are [`Interned`];
//! objects keep their members in document order.

use core::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::pool::Interned;

/// Members of a JSON object, in insertion order.
pub type Map = IndexMap<Interned, Value>;

/// A JSON number.
///
/// Integral text that fits 64 bits parses as an integer, everything else as
/// a float.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// A non-negative integer.
    PosInt(u64),
    /// A negative integer.
    NegInt(i64),
    /// Any other number. Always finite.
    Float(f64),
}

impl Number {
    /// The number as an `i64`, if it is an integer in range.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::PosInt(n) => i64::try_from(n).ok(),
            Number::NegInt(n) => Some(n),
            Number::Float(_) => None,
        }
    }

    /// The number as a `u64`, if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Number::PosInt(n) => Some(n),
            Number::NegInt(_) | Number::Float(_) => None,
        }
    }

    /// The number as an `f64`; large integers lose precision.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::PosInt(n) => n as f64,
            Number::NegInt(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::PosInt(n) => fmt::Display::fmt(&n, f),
            Number::NegInt(n) => fmt::Display::fmt(&n, f),
            Number::Float(n) => fmt::Display::fmt(&n, f),
        }
    }
}

/// Any JSON value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// `null`
    #[default]
    Null,
    /// `true` or `false`
    Bool(bool),
    /// A number
    Number(Number),
    /// A string
    String(Interned),
    /// An array
    Array(Vec<Value>),
    /// An object
    Object(Map),
}

impl Value {
    /// Whether this is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// The number, if this is one.
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// See [`Number::as_i64`].
    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(Number::as_i64)
    }

    /// See [`Number::as_u64`].
    pub fn as_u64(&self) -> Option<u64> {
        self.as_number().and_then(Number::as_u64)
    }

    /// See [`Number::as_f64`].
    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::as_f64)
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The members, if this is an object.
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Looks up a member of an object. `None` for missing members and for
    /// values that are not objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|members| members.get(key))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(Number::PosInt(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        if v < 0 {
            Value::Number(Number::NegInt(v))
        } else {
            Value::Number(Number::PosInt(v.unsigned_abs()))
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(Number::Float(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Interned::from_active(v))
    }
}

impl From<Interned> for Value {
    fn from(v: Interned) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Value::Object(v)
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match *self {
            Number::PosInt(n) => serializer.serialize_u64(n),
            Number::NegInt(n) => serializer.serialize_i64(n),
            Number::Float(n) => serializer.serialize_f64(n),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(members) => serializer.collect_map(members),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(Interned::from_active(v)))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Map::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<Interned, Value>()? {
            // a repeated key keeps its first position and its last value
            members.insert(key, value);
        }
        Ok(Value::Object(members))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(n),
            _ => Err(de::Error::custom("expected a number")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Number, Value};
    use crate::codec::{Codec, Options};
    use crate::error::Error;

    #[test]
    fn number_policy() {
        assert_eq!(
            crate::from_str::<Value>("7"),
            Ok(Value::Number(Number::PosInt(7)))
        );
        assert_eq!(
            crate::from_str::<Value>("-7"),
            Ok(Value::Number(Number::NegInt(-7)))
        );
        assert_eq!(
            crate::from_str::<Value>("18446744073709551615"),
            Ok(Value::Number(Number::PosInt(u64::MAX)))
        );
        assert_eq!(
            crate::from_str::<Value>("18446744073709551616"),
            Ok(Value::Number(Number::Float(18446744073709551616.0)))
        );
        assert_eq!(
            crate::from_str::<Value>("-9223372036854775809"),
            Ok(Value::Number(Number::Float(-9223372036854775809.0)))
        );
        assert_eq!(
            crate::from_str::<Value>("7.0"),
            Ok(Value::Number(Number::Float(7.0)))
        );
        assert_eq!(
            crate::from_str::<Value>("1e2"),
            Ok(Value::Number(Number::Float(100.0)))
        );
        assert_eq!(crate::from_str::<Value>("1e999"), Err(Error::InvalidNumber));
    }

    #[test]
    fn shapes() {
        let value: Value = crate::from_str(
            r#"{"z":null,"a":[true,false,"s"],"m":{"k":-1.5},"e":{}}"#,
        )
        .unwrap();

        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(|k| k.as_str())
            .collect();
        assert_eq!(keys, ["z", "a", "m", "e"]);

        assert!(value.get("z").unwrap().is_null());
        let array = value.get("a").unwrap().as_array().unwrap();
        assert_eq!(array[0].as_bool(), Some(true));
        assert_eq!(array[2].as_str(), Some("s"));
        assert_eq!(value.get("m").and_then(|m| m.get("k")).and_then(Value::as_f64), Some(-1.5));
        assert!(value.get("e").unwrap().as_object().unwrap().is_empty());
        assert_eq!(value.get("missing"), None);
        assert_eq!(value.get("a").unwrap().get("0"), None);
    }

    #[test]
    fn writes_back_in_order() {
        let text = r#"{"z":null,"a":[1,-2,0.5,"x\ny"],"m":{"k":{}},"t":true}"#;
        let value: Value = crate::from_str(text).unwrap();
        assert_eq!(crate::to_string(&value).unwrap(), text);
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let value: Value = crate::from_str(r#"{"a":1,"b":2,"a":3}"#).unwrap();
        assert_eq!(crate::to_string(&value).unwrap(), r#"{"a":3,"b":2}"#);
    }

    #[test]
    fn strings_share_the_codec_pool() {
        let codec = Codec::with_options(Options::strict());
        let value: Value = codec
            .from_str(r#"[{"name":"name"},{"name":"other"}]"#)
            .unwrap();

        let items = value.as_array().unwrap();
        let (first, second) = match (&items[0], &items[1]) {
            (Value::Object(a), Value::Object(b)) => (a, b),
            _ => panic!("expected objects"),
        };
        let (key_a, value_a) = first.get_index(0).unwrap();
        let (key_b, _) = second.get_index(0).unwrap();
        assert!(key_a.ptr_eq(key_b));
        match value_a {
            Value::String(s) => assert!(s.ptr_eq(key_a)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(codec.strings().len(), 2);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(-3i64).as_i64(), Some(-3));
        assert_eq!(Value::from(3i64).as_u64(), Some(3));
        assert_eq!(Value::from(u64::MAX).as_i64(), None);
        assert_eq!(Value::from(2.5).as_i64(), None);
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert_eq!(Value::default(), Value::Null);
        assert_eq!(Number::NegInt(-4).to_string(), "-4");
    }
}
