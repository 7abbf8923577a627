//! # Genius Dashboard Core
//!
//! Topic namespace engine for the Genius Dashboard.
//!
//! This crate provides:
//! - Canonical topic paths (`/a/b/c`) and their segment model
//! - A persistent namespace tree with structural sharing between versions
//! - The topic registry holding live values and announced topic metadata
//! - Optimistic writes with rollback when the transport rejects them
//! - Structural classification of composite sources (choosers, cameras, ...)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod message;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod transport;
pub mod tree;
pub mod writer;

pub use message::{DataType, DataValue, Message, Topic, TopicProperties, ValueParseError};
pub use path::{PathError, TopicPath};
pub use registry::{RegistryClosed, Selection, Snapshot, Subscription, TopicRegistry};
pub use resolver::{
    classify, classify_as, controller_buttons, extract_extra_fields, resolve_sources, source_status,
    write_target, Classification, CompositeKind, ControllerButton, SourceDef, SourceKind,
    SourceStatus, UnknownKind,
};
pub use transport::{Publisher, TransportEvent, TransportFailure};
pub use tree::{Branch, NamespaceTree, Node};
pub use writer::{OptimisticWriter, PendingWrite, WriteError};
