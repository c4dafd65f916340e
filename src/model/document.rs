use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field map of a stored record (camelCase keys, JSON values)
pub type Fields = Map<String, Value>;

/// A raw record as the store holds it: an opaque id plus its fields.
///
/// Documents are untyped on purpose. Typed records are decoded from them
/// on demand, and a document that fails to decode is treated as malformed
/// by whoever consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Document {
            id: id.into(),
            fields,
        }
    }

    /// Decode the fields into a typed record. The id is not part of the
    /// fields; callers attach it themselves.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    /// String value of a top-level field, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Encode a typed record into a field map.
pub fn encode<T: Serialize>(record: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Fields::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// Field deserializer treating an explicit `null` like a missing key.
///
/// Use together with `#[serde(default)]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
