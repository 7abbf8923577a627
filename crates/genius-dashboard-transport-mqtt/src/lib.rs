//! # MQTT Bridge Transport
//!
//! Connects the namespace engine to a robot bridge over MQTT.
//!
//! ## Bridge MQTT Topics
//!
//! The bridge publishes CBOR frames on:
//! - `genius-dashboard/v1/{team}/value/{path}`: value updates
//! - `genius-dashboard/v1/{team}/announce/{path}`: topic announcements
//!
//! and accepts dashboard writes on `genius-dashboard/v1/{team}/publish/{path}`.
//!
//! The transport turns incoming frames into `TransportEvent`s and implements
//! the core `Publisher` for writes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod events;

pub use client::{MqttPublisher, MqttTransport, MqttTransportConfig, TransportError};
pub use events::{parse_event, EventParseError};
