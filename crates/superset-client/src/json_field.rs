//! Serde adapters for fields the API stores as JSON-encoded strings
//! (`params`, `json_metadata`, `default_filters`, ...).

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decode a value that may arrive as a JSON string, an inline value, `null`
/// or an empty string. The last two decode to `T::default()`.
///
/// # Errors
///
/// Returns an error if the decoded JSON does not match `T`.
pub fn decode<T: DeserializeOwned + Default>(value: Value) -> serde_json::Result<T> {
    match value {
        Value::Null => Ok(T::default()),
        Value::String(s) if s.trim().is_empty() => Ok(T::default()),
        Value::String(s) => serde_json::from_str(&s),
        other => serde_json::from_value(other),
    }
}

/// Encode a value as a JSON string.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

/// `#[serde(with = "json_field::string")]` for JSON-string fields.
pub mod string {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    /// Serialize as a JSON-encoded string.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn serialize<T: Serialize, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = super::encode(value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    /// Deserialize from a JSON-encoded string or an inline value.
    ///
    /// # Errors
    ///
    /// Fails when the content does not decode into `T`.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: DeserializeOwned + Default,
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        super::decode(raw).map_err(D::Error::custom)
    }
}

/// `#[serde(deserialize_with = "json_field::ids")]` for relation lists that
/// arrive either as ids or as `{id, ...}` objects.
///
/// # Errors
///
/// Fails on entries that are neither.
pub fn ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.iter()
        .map(|entry| {
            entry
                .as_i64()
                .or_else(|| entry.get("id").and_then(Value::as_i64))
                .ok_or_else(|| D::Error::custom(format!("expected an id, found {entry}")))
        })
        .collect()
}

/// `#[serde(deserialize_with = "json_field::id")]` for a single relation
/// given as an id, an `{id, ...}` object or `null`.
///
/// # Errors
///
/// Fails on anything else.
pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected an integer id, found {n}"))),
        Value::Object(map) => Ok(map.get("id").and_then(Value::as_i64)),
        other => Err(D::Error::custom(format!("expected an id, found {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "string", default)]
        params: Map<String, Value>,
        #[serde(deserialize_with = "ids", default)]
        owners: Vec<i64>,
    }

    #[test]
    fn test_reads_encoded_string() {
        let holder: Holder = serde_json::from_value(json!({"params": "{\"a\": 1}"})).unwrap();
        assert_eq!(holder.params["a"], json!(1));
    }

    #[test]
    fn test_reads_inline_object() {
        let holder: Holder = serde_json::from_value(json!({"params": {"a": 2}})).unwrap();
        assert_eq!(holder.params["a"], json!(2));
    }

    #[test]
    fn test_reads_null_and_empty() {
        let holder: Holder = serde_json::from_value(json!({"params": null})).unwrap();
        assert!(holder.params.is_empty());
        let holder: Holder = serde_json::from_value(json!({"params": ""})).unwrap();
        assert!(holder.params.is_empty());
    }

    #[test]
    fn test_writes_encoded_string() {
        let mut holder = Holder::default();
        holder.params.insert("b".into(), json!([1, 2]));
        let value = serde_json::to_value(&holder).unwrap();
        assert_eq!(value["params"], json!("{\"b\":[1,2]}"));
    }

    #[test]
    fn test_ids_from_objects_or_numbers() {
        let holder: Holder =
            serde_json::from_value(json!({"owners": [{"id": 3, "first_name": "A"}, 4]})).unwrap();
        assert_eq!(holder.owners, vec![3, 4]);
        assert!(serde_json::from_value::<Holder>(json!({"owners": ["x"]})).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Relation {
        #[serde(deserialize_with = "id", default)]
        database: Option<i64>,
    }

    #[test]
    fn test_single_relation() {
        let read = |v: Value| serde_json::from_value::<Relation>(v).map(|r| r.database);
        assert_eq!(read(json!({"database": 5})).unwrap(), Some(5));
        assert_eq!(read(json!({"database": {"id": 6, "database_name": "x"}})).unwrap(), Some(6));
        assert_eq!(read(json!({"database": null})).unwrap(), None);
        assert_eq!(read(json!({})).unwrap(), None);
        assert!(read(json!({"database": "six"})).is_err());
    }
}
