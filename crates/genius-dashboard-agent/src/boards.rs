//! Board layouts.
//!
//! A board is a named set of widgets. Each widget is placed on a grid,
//! shows one catalog display and binds the display's sources to topic paths.
//! Widget order matters: the first widget is drawn on top.

use crate::catalog::{widget_def, OptionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A widget placed on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    /// Grid column
    pub x: i64,
    /// Grid row
    pub y: i64,
    /// Width in grid cells
    pub width: u32,
    /// Height in grid cells
    pub height: u32,
    /// Name, unique within a board
    pub name: String,
    /// Catalog display id
    pub display: String,
    /// Whether the widget can be dragged
    pub locked: bool,
    /// Source name to topic path
    pub sources: BTreeMap<String, String>,
    /// Display options
    pub options: BTreeMap<String, Value>,
    /// Display state kept between runs
    pub state: BTreeMap<String, Value>,
    /// Size follows content
    pub auto_size: bool,
    /// Size cannot be changed by hand
    pub lock_size: bool,
}

/// A named board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Board name
    pub name: String,
    /// Widgets, topmost first
    pub widgets: Vec<Widget>,
    /// Board settings
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl Board {
    /// An empty board.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            widgets: Vec::new(),
            settings: BTreeMap::new(),
        }
    }

    /// The widget called `name`.
    #[must_use]
    pub fn widget(&self, name: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.name == name)
    }

    fn check_options(&self, display: &str, widget: &str, options: &BTreeMap<String, Value>) -> Result<(), BoardError> {
        // Displays missing from the catalog have nothing to check against
        let Some(def) = widget_def(display) else {
            return Ok(());
        };
        def.check_options(options)
            .map_err(|(option, reason)| BoardError::InvalidOption {
                board: self.name.clone(),
                widget: widget.to_string(),
                option,
                reason,
            })
    }

    fn widget_mut(&mut self, name: &str) -> Result<&mut Widget, BoardError> {
        let board = self.name.clone();
        self.widgets
            .iter_mut()
            .find(|w| w.name == name)
            .ok_or(BoardError::UnknownWidget {
                board,
                widget: name.to_string(),
            })
    }
}

/// Fields of a board to overwrite.
#[derive(Debug, Clone, Default)]
pub struct BoardPatch {
    /// New widget list
    pub widgets: Option<Vec<Widget>>,
    /// New settings
    pub settings: Option<BTreeMap<String, Value>>,
}

/// Fields of a widget to overwrite.
#[derive(Debug, Clone, Default)]
pub struct WidgetPatch {
    /// New position
    pub position: Option<(i64, i64)>,
    /// New size
    pub size: Option<(u32, u32)>,
    /// New name
    pub name: Option<String>,
    /// New lock state
    pub locked: Option<bool>,
    /// New sources
    pub sources: Option<BTreeMap<String, String>>,
    /// New options
    pub options: Option<BTreeMap<String, Value>>,
    /// New state
    pub state: Option<BTreeMap<String, Value>>,
    /// New auto-size flag
    pub auto_size: Option<bool>,
    /// New lock-size flag
    pub lock_size: Option<bool>,
}

impl WidgetPatch {
    fn apply(self, widget: &mut Widget) {
        if let Some((x, y)) = self.position {
            widget.x = x;
            widget.y = y;
        }
        if let Some((width, height)) = self.size {
            widget.width = width;
            widget.height = height;
        }
        if let Some(name) = self.name {
            widget.name = name;
        }
        if let Some(locked) = self.locked {
            widget.locked = locked;
        }
        if let Some(sources) = self.sources {
            widget.sources = sources;
        }
        if let Some(options) = self.options {
            widget.options = options;
        }
        if let Some(state) = self.state {
            widget.state = state;
        }
        if let Some(auto_size) = self.auto_size {
            widget.auto_size = auto_size;
        }
        if let Some(lock_size) = self.lock_size {
            widget.lock_size = lock_size;
        }
    }
}

/// Every board and which one is shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStore {
    /// Boards by name
    pub boards: BTreeMap<String, Board>,
    /// Name of the shown board
    pub current_board: String,
}

impl BoardStore {
    /// The shown board, if it exists.
    #[must_use]
    pub fn current(&self) -> Option<&Board> {
        self.boards.get(&self.current_board)
    }

    /// Show another board. The board does not need to exist yet.
    pub fn set_current_board(&mut self, name: impl Into<String>) {
        self.current_board = name.into();
    }

    /// Overwrite fields of a board, creating it if missing.
    pub fn set_board(&mut self, name: &str, patch: BoardPatch) {
        let board = self
            .boards
            .entry(name.to_string())
            .or_insert_with(|| Board::new(name));
        if let Some(widgets) = patch.widgets {
            board.widgets = widgets;
        }
        if let Some(settings) = patch.settings {
            board.settings = settings;
        }
    }

    /// Put `widget` on top of a board, replacing any widget of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownBoard`] if the board does not exist and
    /// [`BoardError::InvalidOption`] if an option is refused by the catalog.
    pub fn add_widget(&mut self, board: &str, widget: Widget) -> Result<(), BoardError> {
        let board = self.board_mut(board)?;
        board.check_options(&widget.display, &widget.name, &widget.options)?;
        board.widgets.retain(|w| w.name != widget.name);
        board.widgets.insert(0, widget);
        Ok(())
    }

    /// Move a widget to the top of its board.
    ///
    /// Unknown widget names leave the board unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownBoard`] if the board does not exist.
    pub fn move_widget_to_front(&mut self, board: &str, widget: &str) -> Result<(), BoardError> {
        let board = self.board_mut(board)?;
        if let Some(index) = board.widgets.iter().position(|w| w.name == widget) {
            let moved = board.widgets.remove(index);
            board.widgets.insert(0, moved);
        }
        Ok(())
    }

    /// Record the position a widget was dragged to.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] if the board or widget does not exist.
    pub fn on_drag_end(&mut self, board: &str, widget: &str, x: i64, y: i64) -> Result<(), BoardError> {
        self.set_widget(
            board,
            widget,
            WidgetPatch {
                position: Some((x, y)),
                ..WidgetPatch::default()
            },
        )
    }

    /// Overwrite fields of a widget.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] if the board or widget does not exist, if the
    /// patch renames the widget to a name already taken, or if the patch
    /// carries options the catalog refuses. A refused patch changes nothing.
    pub fn set_widget(&mut self, board: &str, widget: &str, patch: WidgetPatch) -> Result<(), BoardError> {
        let board = self.board_mut(board)?;
        if let Some(new_name) = &patch.name {
            if new_name != widget && board.widget(new_name).is_some() {
                return Err(BoardError::DuplicateWidget {
                    board: board.name.clone(),
                    widget: new_name.clone(),
                });
            }
        }
        if let Some(options) = &patch.options {
            let display = board.widget_mut(widget)?.display.clone();
            board.check_options(&display, widget, options)?;
        }
        patch.apply(board.widget_mut(widget)?);
        Ok(())
    }

    /// Remove a widget from a board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError`] if the board or widget does not exist.
    pub fn remove_widget(&mut self, board: &str, widget: &str) -> Result<Widget, BoardError> {
        let board = self.board_mut(board)?;
        let index = board
            .widgets
            .iter()
            .position(|w| w.name == widget)
            .ok_or_else(|| BoardError::UnknownWidget {
                board: board.name.clone(),
                widget: widget.to_string(),
            })?;
        Ok(board.widgets.remove(index))
    }

    fn board_mut(&mut self, name: &str) -> Result<&mut Board, BoardError> {
        self.boards
            .get_mut(name)
            .ok_or_else(|| BoardError::UnknownBoard(name.to_string()))
    }
}

/// Errors for board edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// No board of that name
    #[error("unknown board: {0}")]
    UnknownBoard(String),
    /// No widget of that name on the board
    #[error("no widget {widget:?} on board {board:?}")]
    UnknownWidget {
        /// Board name
        board: String,
        /// Widget name
        widget: String,
    },
    /// Another widget already has the name
    #[error("board {board:?} already has a widget {widget:?}")]
    DuplicateWidget {
        /// Board name
        board: String,
        /// Widget name
        widget: String,
    },
    /// An option value is refused by the widget's display
    #[error("widget {widget:?} on board {board:?}: option {option:?} {reason}")]
    InvalidOption {
        /// Board name
        board: String,
        /// Widget name
        widget: String,
        /// Option name
        option: String,
        /// Why it was refused
        reason: OptionError,
    },
}
