//! # Genius Dashboard Protocol
//!
//! Wire frames and MQTT topic scheme for the robot bridge.
//!
//! ## Frames
//!
//! - `ValueFrame`: A timestamped value update for one topic
//! - `AnnounceFrame`: Metadata announced for one topic
//! - `PublishFrame`: A value written by the dashboard
//!
//! ## MQTT Topics
//!
//! Topic scheme: `genius-dashboard/v1/{team}/{kind}/{encoded topic path}`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod messages;
pub mod topics;

pub use address::{robot_host, ServerAddr};
pub use messages::{AnnounceFrame, CborFrame, MessageError, PublishFrame, ValueFrame};
pub use topics::{FrameKind, TopicScheme};
