//! Optimistic writes.
//!
//! A write is applied to the registry immediately as a synthetic message
//! whose timestamp is one past the previous value's, then sent to the
//! transport. If the transport rejects it, the previous message is restored
//! exactly, timestamp included.
//!
//! Concurrent writes to the same path are not sequenced. Each captures the
//! previous message at call time, so a late rollback can overwrite a newer
//! confirmed value.

use crate::message::{DataType, DataValue, Message};
use crate::path::{PathError, TopicPath};
use crate::registry::TopicRegistry;
use crate::transport::{Publisher, TransportFailure};
use crate::tree::Node;

/// Writes values through a [`Publisher`] with local speculation.
#[derive(Debug, Clone)]
pub struct OptimisticWriter<P> {
    registry: TopicRegistry,
    publisher: P,
}

impl<P: Publisher> OptimisticWriter<P> {
    /// Create a writer over a registry and a transport publisher.
    pub fn new(registry: TopicRegistry, publisher: P) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    /// The registry this writer speculates into.
    #[must_use]
    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// Apply `value` to the registry without contacting the transport.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::NotALeaf`] if nothing or a branch lives at
    /// `path`, and [`WriteError::TypeMismatch`] if the existing value has a
    /// different type.
    pub fn speculate(&self, path: &TopicPath, value: DataValue) -> Result<PendingWrite, WriteError> {
        let previous = match self.registry.select_value(path) {
            Some(Node::Leaf(message)) => Message::clone(&message),
            Some(Node::Branch(_)) | None => {
                return Err(WriteError::NotALeaf { path: path.clone() });
            }
        };

        let expected = previous.data_type();
        let actual = value.data_type();
        if expected != actual {
            return Err(WriteError::TypeMismatch {
                path: path.clone(),
                expected,
                actual,
            });
        }

        let timestamp = previous.timestamp.saturating_add(1);
        self.registry.set_topic(Message::new(path.clone(), timestamp, value));
        tracing::debug!(%path, timestamp, "Speculative write applied");

        Ok(PendingWrite {
            registry: self.registry.clone(),
            previous,
        })
    }

    /// Speculate, publish, then confirm or roll back.
    ///
    /// # Errors
    ///
    /// Returns the speculation error without publishing, or
    /// [`WriteError::Transport`] after rolling back a rejected write.
    pub async fn publish(&self, path: &TopicPath, value: DataValue) -> Result<(), WriteError> {
        let pending = self.speculate(path, value.clone())?;

        match self.publisher.publish_value(path, &value).await {
            Ok(()) => {
                pending.confirm();
                Ok(())
            }
            Err(failure) => {
                tracing::warn!(%path, reason = %failure.reason, "Write rejected, rolling back");
                pending.rollback();
                Err(WriteError::Transport(failure))
            }
        }
    }

    /// [`OptimisticWriter::publish`] with a canonical path string.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Path`] if the path is malformed, otherwise as
    /// [`OptimisticWriter::publish`].
    pub async fn publish_str(&self, path: &str, value: DataValue) -> Result<(), WriteError> {
        let path = TopicPath::parse(path)?;
        self.publish(&path, value).await
    }
}

/// A speculative write awaiting the transport's verdict.
#[derive(Debug)]
#[must_use = "a pending write must be confirmed or rolled back"]
pub struct PendingWrite {
    registry: TopicRegistry,
    previous: Message,
}

impl PendingWrite {
    /// The message that was current before the write.
    pub fn previous(&self) -> &Message {
        &self.previous
    }

    /// Keep the speculative value.
    pub fn confirm(self) {
        tracing::trace!(path = %self.previous.path, "Speculative write confirmed");
    }

    /// Restore the previous message.
    pub fn rollback(self) {
        tracing::debug!(
            path = %self.previous.path,
            timestamp = self.previous.timestamp,
            "Rolling back speculative write"
        );
        self.registry.set_topic(self.previous);
    }
}

/// Errors from [`OptimisticWriter`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WriteError {
    /// Nothing, or a branch, exists at the path
    #[error("cannot write to {path}: not a leaf topic")]
    NotALeaf {
        /// Target path
        path: TopicPath,
    },
    /// The value's type differs from the existing topic's type
    #[error("cannot write {actual} to {path}: topic has type {expected}")]
    TypeMismatch {
        /// Target path
        path: TopicPath,
        /// Type of the current value
        expected: DataType,
        /// Type of the written value
        actual: DataType,
    },
    /// Malformed target path
    #[error(transparent)]
    Path(#[from] PathError),
    /// The transport rejected the write
    #[error(transparent)]
    Transport(#[from] TransportFailure),
}
