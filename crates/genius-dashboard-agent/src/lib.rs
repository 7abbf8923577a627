//! # Genius Dashboard Agent
//!
//! Headless dashboard runtime for robot telemetry.
//!
//! ## Architecture
//!
//! The agent runs three concurrent activities:
//! 1. **Ingress**: Applies bridge events to the topic registry
//! 2. **Widget watches**: One task per widget of the current board, following
//!    the widget's sources and reporting when they become ready
//! 3. **Console**: Reads commands from stdin to inspect topics, write values
//!    and edit boards
//!
//! Board layouts persist in `SQLite` with versioned migrations.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod boards;
pub mod catalog;
pub mod config;
pub mod console;
pub mod logging;
pub mod migrations;
pub mod persistence;
pub mod runtime;
pub mod watch;

pub use boards::{Board, BoardError, BoardPatch, BoardStore, Widget, WidgetPatch};
pub use config::{ConfigError, DashboardConfig};
pub use persistence::{SqliteStore, StoreError};
pub use runtime::Dashboard;
