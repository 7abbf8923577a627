//! Boundary between the namespace engine and the network transport.

use crate::message::{DataValue, Message, Topic};
use crate::path::TopicPath;
use async_trait::async_trait;

/// An event delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A value update for a topic
    TopicUpdate(Message),
    /// A topic was announced, or its metadata changed
    TopicAnnounce(Topic),
    /// The transport connected or disconnected
    Connectivity(bool),
}

/// The write surface of a transport.
///
/// Implementations report the outcome of a single write. No retries are
/// performed by callers.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a value to `path`. The value carries its own type.
    async fn publish_value(&self, path: &TopicPath, value: &DataValue)
        -> Result<(), TransportFailure>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish_value(
        &self,
        path: &TopicPath,
        value: &DataValue,
    ) -> Result<(), TransportFailure> {
        (**self).publish_value(path, value).await
    }
}

/// A write rejected by the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport failure: {reason}")]
pub struct TransportFailure {
    /// Reason reported by the transport
    pub reason: String,
}

impl TransportFailure {
    /// Create a failure with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
