//! Board store versions.
//!
//! Stored board stores carry the version they were written with. Loading
//! applies every step from that version up to [`CURRENT_VERSION`].

use crate::boards::{Board, BoardStore, Widget};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Version written by this build.
pub const CURRENT_VERSION: u32 = 1;

/// Widget as stored before per-widget state and sizing flags.
#[derive(Debug, Clone, Deserialize)]
pub struct V0Widget {
    /// Grid column
    pub x: i64,
    /// Grid row
    pub y: i64,
    /// Width in grid cells
    pub width: u32,
    /// Height in grid cells
    pub height: u32,
    /// Name
    pub name: String,
    /// Whether the widget can be dragged
    pub locked: bool,
    /// Source name to topic path
    pub sources: BTreeMap<String, String>,
    /// Display options
    pub options: BTreeMap<String, Value>,
    /// Catalog display id
    pub display: String,
}

/// Board of version 0.
#[derive(Debug, Clone, Deserialize)]
pub struct V0Board {
    /// Board name
    pub name: String,
    /// Widgets, topmost first
    pub widgets: Vec<V0Widget>,
    /// Board settings
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

/// Board store of version 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V0BoardStore {
    /// Boards by name
    pub boards: BTreeMap<String, V0Board>,
    /// Name of the shown board
    pub current_board: String,
}

/// Add empty state and enable both sizing flags on every widget.
#[must_use]
pub fn v0_to_v1(store: V0BoardStore) -> BoardStore {
    let boards = store
        .boards
        .into_iter()
        .map(|(key, board)| {
            let widgets = board
                .widgets
                .into_iter()
                .map(|w| Widget {
                    x: w.x,
                    y: w.y,
                    width: w.width,
                    height: w.height,
                    name: w.name,
                    display: w.display,
                    locked: w.locked,
                    sources: w.sources,
                    options: w.options,
                    state: BTreeMap::new(),
                    auto_size: true,
                    lock_size: true,
                })
                .collect();
            let board = Board {
                name: board.name,
                widgets,
                settings: board.settings,
            };
            (key, board)
        })
        .collect();

    BoardStore {
        boards,
        current_board: store.current_board,
    }
}

/// Bring a stored board store written at `from_version` up to date.
///
/// # Errors
///
/// Returns [`MigrationError::UnsupportedVersion`] for versions newer than
/// [`CURRENT_VERSION`] and [`MigrationError::Malformed`] when the payload
/// does not match its version.
pub fn migrate(raw: Value, from_version: u32) -> Result<BoardStore, MigrationError> {
    let store = match from_version {
        0 => {
            let v0: V0BoardStore = serde_json::from_value(raw).map_err(|e| MigrationError::Malformed {
                version: 0,
                reason: e.to_string(),
            })?;
            tracing::info!(boards = v0.boards.len(), "Migrating board store from version 0");
            v0_to_v1(v0)
        }
        CURRENT_VERSION => serde_json::from_value(raw).map_err(|e| MigrationError::Malformed {
            version: CURRENT_VERSION,
            reason: e.to_string(),
        })?,
        version => return Err(MigrationError::UnsupportedVersion(version)),
    };
    Ok(store)
}

/// Errors that can occur while migrating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// Written by a newer build
    #[error("board store version {0} is newer than supported version {CURRENT_VERSION}")]
    UnsupportedVersion(u32),
    /// Payload does not match its version
    #[error("malformed version {version} board store: {reason}")]
    Malformed {
        /// Declared version
        version: u32,
        /// Decoder message
        reason: String,
    },
}
