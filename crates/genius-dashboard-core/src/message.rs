//! Topic values and announced topic metadata.
//!
//! A [`Message`] is a timestamped value observed for a topic. A [`Topic`] is
//! the metadata the robot announces for a topic (type, id, properties) and
//! carries no live data.
//!
//! Wire shape of a message (JSON):
//!
//! ```json
//! { "topic_name": "/SmartDashboard/x", "timestamp": 5, "type": "int", "data": 10 }
//! ```

use crate::path::TopicPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The type of a topic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// A single boolean
    #[serde(rename = "boolean")]
    Boolean,
    /// A 64-bit float
    #[serde(rename = "double")]
    Double,
    /// A 64-bit signed integer
    #[serde(rename = "int")]
    Int,
    /// A 32-bit float
    #[serde(rename = "float")]
    Float,
    /// A UTF-8 string
    #[serde(rename = "string")]
    String,
    /// Opaque bytes
    #[serde(rename = "raw")]
    Raw,
    /// Array of booleans
    #[serde(rename = "boolean[]")]
    BooleanArray,
    /// Array of doubles
    #[serde(rename = "double[]")]
    DoubleArray,
    /// Array of ints
    #[serde(rename = "int[]")]
    IntArray,
    /// Array of floats
    #[serde(rename = "float[]")]
    FloatArray,
    /// Array of strings
    #[serde(rename = "string[]")]
    StringArray,
}

impl DataType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Double => "double",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Raw => "raw",
            DataType::BooleanArray => "boolean[]",
            DataType::DoubleArray => "double[]",
            DataType::IntArray => "int[]",
            DataType::FloatArray => "float[]",
            DataType::StringArray => "string[]",
        }
    }

    /// Whether values of this type are arrays.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            DataType::BooleanArray
                | DataType::DoubleArray
                | DataType::IntArray
                | DataType::FloatArray
                | DataType::StringArray
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed topic value.
///
/// The variant is the type, so a value can never disagree with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DataValue {
    /// A single boolean
    #[serde(rename = "boolean")]
    Boolean(bool),
    /// A 64-bit float
    #[serde(rename = "double")]
    Double(f64),
    /// A 64-bit signed integer
    #[serde(rename = "int")]
    Int(i64),
    /// A 32-bit float
    #[serde(rename = "float")]
    Float(f32),
    /// A UTF-8 string
    #[serde(rename = "string")]
    String(String),
    /// Opaque bytes, base64 on the wire
    #[serde(rename = "raw")]
    Raw(#[serde(with = "raw_base64")] Vec<u8>),
    /// Array of booleans
    #[serde(rename = "boolean[]")]
    BooleanArray(Vec<bool>),
    /// Array of doubles
    #[serde(rename = "double[]")]
    DoubleArray(Vec<f64>),
    /// Array of ints
    #[serde(rename = "int[]")]
    IntArray(Vec<i64>),
    /// Array of floats
    #[serde(rename = "float[]")]
    FloatArray(Vec<f32>),
    /// Array of strings
    #[serde(rename = "string[]")]
    StringArray(Vec<String>),
}

impl DataValue {
    /// The type of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Boolean(_) => DataType::Boolean,
            DataValue::Double(_) => DataType::Double,
            DataValue::Int(_) => DataType::Int,
            DataValue::Float(_) => DataType::Float,
            DataValue::String(_) => DataType::String,
            DataValue::Raw(_) => DataType::Raw,
            DataValue::BooleanArray(_) => DataType::BooleanArray,
            DataValue::DoubleArray(_) => DataType::DoubleArray,
            DataValue::IntArray(_) => DataType::IntArray,
            DataValue::FloatArray(_) => DataType::FloatArray,
            DataValue::StringArray(_) => DataType::StringArray,
        }
    }

    /// The string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(value) => Some(value),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// The integer payload, if this is an int value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Parse user-entered text as a value of the given type.
    ///
    /// Scalars use their usual text form, `raw` expects base64 and arrays
    /// expect a JSON array (`[1, 2, 3]`, `["a", "b"]`).
    ///
    /// # Errors
    ///
    /// Returns [`ValueParseError`] if the text is not a valid value of `ty`.
    pub fn parse_as(ty: DataType, text: &str) -> Result<Self, ValueParseError> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;

        let text = text.trim();
        let invalid = |reason: String| ValueParseError {
            data_type: ty,
            input: text.to_string(),
            reason,
        };

        let value = match ty {
            DataType::Boolean => match text {
                "true" => DataValue::Boolean(true),
                "false" => DataValue::Boolean(false),
                _ => return Err(invalid("expected true or false".to_string())),
            },
            DataType::Double => DataValue::Double(text.parse().map_err(|e| invalid(format!("{e}")))?),
            DataType::Int => DataValue::Int(text.parse().map_err(|e| invalid(format!("{e}")))?),
            DataType::Float => DataValue::Float(text.parse().map_err(|e| invalid(format!("{e}")))?),
            DataType::String => DataValue::String(text.to_string()),
            DataType::Raw => {
                DataValue::Raw(STANDARD.decode(text).map_err(|e| invalid(e.to_string()))?)
            }
            DataType::BooleanArray => {
                DataValue::BooleanArray(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
            }
            DataType::DoubleArray => {
                DataValue::DoubleArray(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
            }
            DataType::IntArray => {
                DataValue::IntArray(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
            }
            DataType::FloatArray => {
                DataValue::FloatArray(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
            }
            DataType::StringArray => {
                DataValue::StringArray(serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?)
            }
        };

        Ok(value)
    }
}

/// Human readable rendering: floating point values get two decimals, raw
/// data is not rendered.
impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T>(
            f: &mut fmt::Formatter<'_>,
            items: &[T],
            item: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
        ) -> fmt::Result {
            f.write_str("[")?;
            for (i, value) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                item(f, value)?;
            }
            f.write_str("]")
        }

        match self {
            DataValue::Boolean(value) => write!(f, "{value}"),
            DataValue::Double(value) => write!(f, "{value:.2}"),
            DataValue::Int(value) => write!(f, "{value}"),
            DataValue::Float(value) => write!(f, "{value:.2}"),
            DataValue::String(value) => write!(f, "{value:?}"),
            DataValue::Raw(bytes) => write!(f, "<raw: {} bytes>", bytes.len()),
            DataValue::BooleanArray(values) => list(f, values, |f, v| write!(f, "{v}")),
            DataValue::DoubleArray(values) => list(f, values, |f, v| write!(f, "{v:.2}")),
            DataValue::IntArray(values) => list(f, values, |f, v| write!(f, "{v}")),
            DataValue::FloatArray(values) => list(f, values, |f, v| write!(f, "{v:.2}")),
            DataValue::StringArray(values) => list(f, values, |f, v| write!(f, "{v:?}")),
        }
    }
}

/// A timestamped value observed for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Topic path this value belongs to
    #[serde(rename = "topic_name")]
    pub path: TopicPath,
    /// Monotonic per-topic timestamp
    pub timestamp: u64,
    /// The typed value
    #[serde(flatten)]
    pub value: DataValue,
}

impl Message {
    /// Create a new message.
    #[must_use]
    pub fn new(path: TopicPath, timestamp: u64, value: DataValue) -> Self {
        Self {
            path,
            timestamp,
            value,
        }
    }

    /// The type of the carried value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }
}

/// Metadata announced for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Topic path
    pub name: TopicPath,
    /// Server-assigned topic id
    pub id: i64,
    /// Publisher id, when the topic is published by this client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubuid: Option<i64>,
    /// Value type of the topic
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Topic properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<TopicProperties>,
}

impl Topic {
    /// Create a topic announcement without properties.
    #[must_use]
    pub fn new(name: TopicPath, id: i64, data_type: DataType) -> Self {
        Self {
            name,
            id,
            pubuid: None,
            data_type,
            properties: None,
        }
    }
}

/// Properties attached to an announced topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicProperties {
    /// Value survives server restarts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<bool>,
    /// Topic survives publisher disconnect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retained: Option<bool>,
    /// Extension properties, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Error parsing text into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse {input:?} as {data_type}: {reason}")]
pub struct ValueParseError {
    /// Requested type
    pub data_type: DataType,
    /// Offending input
    pub input: String,
    /// Parser message
    pub reason: String,
}

mod raw_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> TopicPath {
        TopicPath::parse(s).unwrap()
    }

    #[test]
    fn message_wire_shape() {
        let message = Message::new(path("/SmartDashboard/x"), 5, DataValue::Int(10));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({ "topic_name": "/SmartDashboard/x", "timestamp": 5, "type": "int", "data": 10 })
        );
    }

    #[test]
    fn message_from_json() {
        let message: Message = serde_json::from_value(json!({
            "topic_name": "/SmartDashboard/Auto/options",
            "timestamp": 12,
            "type": "string[]",
            "data": ["Left", "Right"]
        }))
        .unwrap();

        assert_eq!(message.data_type(), DataType::StringArray);
        assert_eq!(
            message.value,
            DataValue::StringArray(vec!["Left".to_string(), "Right".to_string()])
        );
    }

    #[test]
    fn mismatched_data_is_rejected() {
        let result: Result<Message, _> = serde_json::from_value(json!({
            "topic_name": "/x",
            "timestamp": 1,
            "type": "boolean",
            "data": "yes"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn raw_is_base64_on_the_wire() {
        let message = Message::new(path("/raw"), 1, DataValue::Raw(vec![0xde, 0xad]));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["data"], json!("3q0="));

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back.value, DataValue::Raw(vec![0xde, 0xad]));
    }

    #[test]
    fn topic_properties_keep_extensions() {
        let topic: Topic = serde_json::from_value(json!({
            "name": "/SmartDashboard/speed",
            "id": 7,
            "type": "double",
            "properties": { "persistent": true, "cached": false }
        }))
        .unwrap();

        let properties = topic.properties.unwrap();
        assert_eq!(properties.persistent, Some(true));
        assert_eq!(properties.retained, None);
        assert_eq!(properties.extra.get("cached"), Some(&json!(false)));
    }

    #[test]
    fn parse_as_typed_values() {
        assert_eq!(
            DataValue::parse_as(DataType::Boolean, "true").unwrap(),
            DataValue::Boolean(true)
        );
        assert_eq!(
            DataValue::parse_as(DataType::Int, " 42 ").unwrap(),
            DataValue::Int(42)
        );
        assert_eq!(
            DataValue::parse_as(DataType::DoubleArray, "[1.5, 2]").unwrap(),
            DataValue::DoubleArray(vec![1.5, 2.0])
        );
        assert!(DataValue::parse_as(DataType::Int, "4.2").is_err());
        assert!(DataValue::parse_as(DataType::Boolean, "yes").is_err());
    }

    #[test]
    fn display_rounds_floating_point() {
        assert_eq!(DataValue::Double(1.0 / 3.0).to_string(), "0.33");
        assert_eq!(
            DataValue::FloatArray(vec![1.0, 2.5]).to_string(),
            "[1.00, 2.50]"
        );
        assert_eq!(DataValue::Raw(vec![1, 2, 3]).to_string(), "<raw: 3 bytes>");
    }
}
