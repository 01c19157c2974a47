//! Typed values returned by the document database.
//!
//! Fauna tags non-JSON types on the wire (`@ref`, `@ts`, `@date`, `@obj`).
//! [`Value::from_wire`] strips those tags into Rust types, [`Value::to_wire`]
//! encodes a value as a query literal, and the `Serialize` impl renders the
//! plain JSON handed back to HTTP callers.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Map, Value as Json};

use super::error::DbError;

/// Reference to a document or a schema object.
///
/// Documents carry their collection name. Schema objects carry the name of
/// their schema class (`collections`, `indexes`, `functions`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref {
    pub collection: String,
    pub id: String,
}

impl Ref {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    fn to_wire(&self) -> Json {
        match self.collection.as_str() {
            "collections" => json!({ "collection": self.id }),
            "indexes" => json!({ "index": self.id }),
            "functions" => json!({ "function": self.id }),
            collection => json!({ "ref": { "collection": collection }, "id": self.id }),
        }
    }
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("collection", &self.collection)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    Date(NaiveDate),
    Ref(Ref),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Decode a value from Fauna's tagged JSON.
    pub fn from_wire(json: Json) -> Result<Self, DbError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| DbError::decode(format!("unrepresentable number {n}"))),
            },
            Json::String(s) => Ok(Value::String(s)),
            Json::Array(items) => items
                .into_iter()
                .map(Value::from_wire)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Json::Object(map) => Self::decode_object(map),
        }
    }

    fn decode_object(mut map: Map<String, Json>) -> Result<Self, DbError> {
        if map.len() == 1 {
            if let Some(inner) = map.remove("@ref") {
                return decode_ref(inner).map(Value::Ref);
            }
            if let Some(inner) = map.remove("@ts") {
                let raw = inner
                    .as_str()
                    .ok_or_else(|| DbError::decode("@ts must be a string"))?;
                let time = DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| DbError::decode(format!("invalid @ts `{raw}`: {e}")))?;
                return Ok(Value::Time(time.with_timezone(&Utc)));
            }
            if let Some(inner) = map.remove("@date") {
                let raw = inner
                    .as_str()
                    .ok_or_else(|| DbError::decode("@date must be a string"))?;
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|e| DbError::decode(format!("invalid @date `{raw}`: {e}")))?;
                return Ok(Value::Date(date));
            }
            if let Some(inner) = map.remove("@obj") {
                return match inner {
                    Json::Object(fields) => decode_fields(fields),
                    _ => Err(DbError::decode("@obj must wrap an object")),
                };
            }
        }
        decode_fields(map)
    }

    /// Encode this value as a literal inside a query expression.
    pub fn to_wire(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::String(s) => Json::String(s.clone()),
            Value::Time(t) => json!({ "@ts": format_time(t) }),
            Value::Date(d) => json!({ "@date": d.format("%Y-%m-%d").to_string() }),
            Value::Ref(r) => r.to_wire(),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_wire).collect()),
            Value::Object(fields) => {
                let inner: Map<String, Json> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                json!({ "object": inner })
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Ordering between two scalars of compatible types, `None` otherwise.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Ref(a), Value::Ref(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::String(_) => "string",
            Value::Time(_) => "time",
            Value::Date(_) => "date",
            Value::Ref(_) => "ref",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Time(t) => serializer.serialize_str(&format_time(t)),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Ref(r) => r.serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(fields) => serializer.collect_map(fields),
        }
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_fields(map: Map<String, Json>) -> Result<Value, DbError> {
    map.into_iter()
        .map(|(k, v)| Value::from_wire(v).map(|v| (k, v)))
        .collect::<Result<BTreeMap<_, _>, _>>()
        .map(Value::Object)
}

fn decode_ref(inner: Json) -> Result<Ref, DbError> {
    let id = inner
        .get("id")
        .and_then(Json::as_str)
        .ok_or_else(|| DbError::decode("@ref without an id"))?
        .to_string();
    let collection = match inner.get("collection").or_else(|| inner.get("class")) {
        Some(parent) => match Value::from_wire(parent.clone())? {
            Value::Ref(parent) => parent.id,
            other => {
                return Err(DbError::decode(format!(
                    "@ref collection must be a ref, got {}",
                    other.type_name()
                )))
            }
        },
        None => String::new(),
    };
    Ok(Ref { collection, id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn shipping_doc_wire() -> Json {
        json!({
            "ref": { "@ref": {
                "id": "327123234559361616",
                "collection": { "@ref": {
                    "id": "Shipping",
                    "collection": { "@ref": { "id": "collections" } }
                }}
            }},
            "ts": 1648200000000000_i64,
            "data": {
                "startDate": { "@ts": "2022-03-25T00:00:00Z" },
                "endDate": { "@ts": "2022-03-26T00:00:00Z" },
                "message": "TODAYS DATE TOMORROW EXPIRE"
            }
        })
    }

    #[test]
    fn decodes_tagged_document() {
        let doc = Value::from_wire(shipping_doc_wire()).unwrap();

        let r = doc.get("ref").and_then(Value::as_reference).unwrap();
        assert_eq!(r, &Ref::new("Shipping", "327123234559361616"));

        let data = doc.get("data").unwrap();
        assert_eq!(
            data.get("startDate").and_then(Value::as_time),
            Some(Utc.with_ymd_and_hms(2022, 3, 25, 0, 0, 0).unwrap())
        );
        assert_eq!(
            data.get("message").and_then(Value::as_str),
            Some("TODAYS DATE TOMORROW EXPIRE")
        );
    }

    #[test]
    fn escaped_object_keeps_reserved_keys() {
        let value = Value::from_wire(json!({ "@obj": { "@ts": "not a time" } })).unwrap();
        assert_eq!(value.get("@ts").and_then(Value::as_str), Some("not a time"));
    }

    #[test]
    fn plain_json_rendering() {
        let doc = Value::from_wire(shipping_doc_wire()).unwrap();
        let plain = serde_json::to_value(&doc).unwrap();

        assert_eq!(plain["ref"], json!({ "id": "327123234559361616", "collection": "Shipping" }));
        assert_eq!(plain["data"]["startDate"], json!("2022-03-25T00:00:00.000Z"));
        assert_eq!(plain["ts"], json!(1648200000000000_i64));
    }

    #[test]
    fn literal_encoding_wraps_objects() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "at".to_string(),
            Value::Time(Utc.with_ymd_and_hms(2022, 3, 26, 0, 0, 0).unwrap()),
        );
        assert_eq!(
            Value::Object(fields).to_wire(),
            json!({ "object": { "at": { "@ts": "2022-03-26T00:00:00.000Z" } } })
        );
    }

    #[test]
    fn bad_timestamp_is_a_decode_error() {
        assert!(Value::from_wire(json!({ "@ts": "yesterday" })).is_err());
    }

    #[test]
    fn compares_only_compatible_scalars() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
    }
}
