//! Widget catalog.
//!
//! Each display id maps to the sources the display reads and the options it
//! accepts.

use crate::boards::Widget;
use genius_dashboard_core::{CompositeKind, DataType, SourceDef};
use serde_json::Value;
use std::collections::BTreeMap;

/// Every display id, in catalog order.
pub const DISPLAYS: [&str; 8] = [
    "simple",
    "editable",
    "toggle",
    "chooser",
    "camera",
    "command",
    "controller",
    "subsystem",
];

/// The corners a controller grid can start from.
pub const CONTROLLER_STARTS: [&str; 4] = ["top-left", "top-right", "bottom-left", "bottom-right"];

/// Declaration of one display option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionDef {
    /// An integer option
    Int {
        /// Shown to the user
        description: &'static str,
        /// Default value
        default: i64,
        /// Smallest accepted value
        min: Option<i64>,
        /// Largest accepted value
        max: Option<i64>,
    },
    /// One of a fixed set of strings
    Enum {
        /// Shown to the user
        description: &'static str,
        /// Allowed values
        values: &'static [&'static str],
        /// Default value
        default: &'static str,
    },
}

impl OptionDef {
    /// Default value of the option.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Int { default, .. } => Value::from(*default),
            Self::Enum { default, .. } => Value::from(*default),
        }
    }

    /// Check `value` against the option's type and bounds.
    ///
    /// # Errors
    ///
    /// Returns the first [`OptionError`] the value violates.
    pub fn accepts(&self, value: &Value) -> Result<(), OptionError> {
        match self {
            Self::Int { min, max, .. } => {
                let n = value.as_i64().ok_or(OptionError::NotAnInteger)?;
                if let Some(min) = *min {
                    if n < min {
                        return Err(OptionError::BelowMin(min));
                    }
                }
                if let Some(max) = *max {
                    if n > max {
                        return Err(OptionError::AboveMax(max));
                    }
                }
                Ok(())
            }
            Self::Enum { values, .. } => {
                if value.as_str().is_some_and(|v| values.contains(&v)) {
                    Ok(())
                } else {
                    Err(OptionError::NotInEnum(values.join(", ")))
                }
            }
        }
    }
}

/// Why an option value was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    /// The display has no option of that name
    #[error("not an option of this display")]
    Unknown,
    /// Int option given something else
    #[error("must be an integer")]
    NotAnInteger,
    /// Int option below its minimum
    #[error("must be greater than or equal to {0}")]
    BelowMin(i64),
    /// Int option above its maximum
    #[error("must be less than or equal to {0}")]
    AboveMax(i64),
    /// Enum option given a value outside the set
    #[error("must be one of: {0}")]
    NotInEnum(String),
}

/// A display and what it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDef {
    /// Display id
    pub display: &'static str,
    /// Shown to the user
    pub description: &'static str,
    /// Sources by name
    pub sources: Vec<(&'static str, SourceDef)>,
    /// Options by name
    pub options: Vec<(&'static str, OptionDef)>,
}

impl WidgetDef {
    /// The source called `name`.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceDef> {
        self.sources.iter().find(|(n, _)| *n == name).map(|(_, def)| def)
    }

    /// The option called `name`.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&OptionDef> {
        self.options.iter().find(|(n, _)| *n == name).map(|(_, def)| def)
    }

    /// Check every entry of `options` against this display's declarations.
    ///
    /// # Errors
    ///
    /// Returns the name of the first offending option and why it was refused.
    pub fn check_options(&self, options: &BTreeMap<String, Value>) -> Result<(), (String, OptionError)> {
        for (name, value) in options {
            let def = self.option(name).ok_or_else(|| (name.clone(), OptionError::Unknown))?;
            def.accepts(value).map_err(|err| (name.clone(), err))?;
        }
        Ok(())
    }

    /// Every option at its default value.
    #[must_use]
    pub fn default_options(&self) -> BTreeMap<String, Value> {
        self.options
            .iter()
            .map(|(name, def)| ((*name).to_string(), def.default_value()))
            .collect()
    }

    /// A widget of this display at the origin, bound to `sources`.
    #[must_use]
    pub fn new_widget(&self, name: impl Into<String>, sources: BTreeMap<String, String>) -> Widget {
        Widget {
            x: 0,
            y: 0,
            width: 2,
            height: 1,
            name: name.into(),
            display: self.display.to_string(),
            locked: false,
            sources,
            options: self.default_options(),
            state: BTreeMap::new(),
            auto_size: true,
            lock_size: true,
        }
    }
}

/// Look up a display id.
#[must_use]
pub fn widget_def(display: &str) -> Option<WidgetDef> {
    let def = match display {
        "simple" => WidgetDef {
            display: "simple",
            description: "Shows any value as text",
            sources: vec![("data", SourceDef::topic(&[], "Value to show"))],
            options: Vec::new(),
        },
        "editable" => WidgetDef {
            display: "editable",
            description: "Shows a value and lets it be edited",
            sources: vec![(
                "data",
                SourceDef::topic(
                    &[
                        DataType::Boolean,
                        DataType::Int,
                        DataType::Float,
                        DataType::Double,
                        DataType::String,
                    ],
                    "Value to edit",
                ),
            )],
            options: Vec::new(),
        },
        "toggle" => WidgetDef {
            display: "toggle",
            description: "Switches a boolean on and off",
            sources: vec![("data", SourceDef::topic(&[DataType::Boolean], "Boolean to toggle"))],
            options: Vec::new(),
        },
        "chooser" => WidgetDef {
            display: "chooser",
            description: "Picks one of the offered options",
            sources: vec![(
                "data",
                SourceDef::composite(CompositeKind::Chooser, "Sendable chooser"),
            )],
            options: Vec::new(),
        },
        "camera" => WidgetDef {
            display: "camera",
            description: "Shows a camera stream",
            sources: vec![("data", SourceDef::composite(CompositeKind::Camera, "Camera publisher"))],
            options: vec![(
                "width",
                OptionDef::Int {
                    description: "Stream width in pixels",
                    default: 300,
                    min: Some(50),
                    max: Some(500),
                },
            )],
        },
        "command" => WidgetDef {
            display: "command",
            description: "Starts and cancels a command",
            sources: vec![("data", SourceDef::composite(CompositeKind::Command, "Command"))],
            options: Vec::new(),
        },
        "controller" => WidgetDef {
            display: "controller",
            description: "Shows the button bindings of a controller",
            sources: vec![(
                "data",
                SourceDef::composite(CompositeKind::Controller, "Controller bindings"),
            )],
            options: vec![
                (
                    "columns",
                    OptionDef::Int {
                        description: "Buttons per row",
                        default: 6,
                        min: None,
                        max: None,
                    },
                ),
                (
                    "start",
                    OptionDef::Enum {
                        description: "Corner of the first button",
                        values: &CONTROLLER_STARTS,
                        default: "bottom-left",
                    },
                ),
            ],
        },
        "subsystem" => WidgetDef {
            display: "subsystem",
            description: "Shows the running command of a subsystem",
            sources: vec![("data", SourceDef::composite(CompositeKind::Subsystem, "Subsystem"))],
            options: Vec::new(),
        },
        _ => return None,
    };
    Some(def)
}
