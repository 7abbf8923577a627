//! Incoming bridge frames.

use genius_dashboard_core::TransportEvent;
use genius_dashboard_proto::{AnnounceFrame, CborFrame, FrameKind, MessageError, TopicScheme, ValueFrame};

/// Parse a bridge frame from an MQTT topic and payload.
///
/// # Topic Format
///
/// `{prefix}/v1/{team}/{value|announce}/{encoded topic path}`
///
/// # Errors
///
/// Returns error if the topic is not part of `scheme`, names a kind the
/// dashboard does not consume, or the payload is not a valid frame.
pub fn parse_event(scheme: &TopicScheme, topic: &str, payload: &[u8]) -> Result<TransportEvent, EventParseError> {
    let (path, kind) = scheme
        .parse(topic)
        .ok_or_else(|| EventParseError::InvalidTopic(topic.to_string()))?;

    match kind {
        FrameKind::Value => {
            let frame = ValueFrame::from_cbor(payload)?;
            Ok(TransportEvent::TopicUpdate(frame.into_message(path)))
        }
        FrameKind::Announce => {
            let frame = AnnounceFrame::from_cbor(payload)?;
            Ok(TransportEvent::TopicAnnounce(frame.into_topic(path)))
        }
        FrameKind::Publish => Err(EventParseError::UnexpectedKind(kind.as_str().to_string())),
    }
}

/// Errors that can occur parsing bridge frames.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventParseError {
    /// Topic format is invalid
    #[error("invalid topic format: {0}")]
    InvalidTopic(String),
    /// Frame kind is not consumed by the dashboard
    #[error("unexpected frame kind: {0}")]
    UnexpectedKind(String),
    /// Payload could not be decoded
    #[error("payload decode error: {0}")]
    Payload(#[from] MessageError),
}
