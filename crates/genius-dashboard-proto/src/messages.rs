//! Bridge frames.
//!
//! The topic a frame travels on names the topic path it is about, so frames
//! carry only what the topic does not.

use genius_dashboard_core::{DataType, DataValue, Message, Topic, TopicPath, TopicProperties};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// CBOR encoding shared by every frame.
pub trait CborFrame: Serialize + DeserializeOwned {
    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// A value update sent by the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFrame {
    /// Robot-side timestamp of the value
    pub timestamp: u64,
    /// The typed value (`type` and `data` on the wire)
    #[serde(flatten)]
    pub value: DataValue,
}

impl ValueFrame {
    /// The message this frame carries for `path`.
    #[must_use]
    pub fn into_message(self, path: TopicPath) -> Message {
        Message::new(path, self.timestamp, self.value)
    }
}

impl From<&Message> for ValueFrame {
    fn from(message: &Message) -> Self {
        Self {
            timestamp: message.timestamp,
            value: message.value.clone(),
        }
    }
}

impl CborFrame for ValueFrame {}

/// Topic metadata sent by the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnounceFrame {
    /// Server-assigned topic id
    pub id: i64,
    /// Publisher id, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubuid: Option<i64>,
    /// Value type of the topic
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Topic properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<TopicProperties>,
}

impl AnnounceFrame {
    /// The announcement this frame carries for `path`.
    #[must_use]
    pub fn into_topic(self, path: TopicPath) -> Topic {
        Topic {
            name: path,
            id: self.id,
            pubuid: self.pubuid,
            data_type: self.data_type,
            properties: self.properties,
        }
    }
}

impl From<&Topic> for AnnounceFrame {
    fn from(topic: &Topic) -> Self {
        Self {
            id: topic.id,
            pubuid: topic.pubuid,
            data_type: topic.data_type,
            properties: topic.properties.clone(),
        }
    }
}

impl CborFrame for AnnounceFrame {}

/// A value written by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishFrame {
    /// The typed value (`type` and `data` on the wire)
    #[serde(flatten)]
    pub value: DataValue,
}

impl PublishFrame {
    /// Create a new publish frame.
    #[must_use]
    pub fn new(value: DataValue) -> Self {
        Self { value }
    }
}

impl CborFrame for PublishFrame {}

/// Errors for frame serialization/deserialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}
