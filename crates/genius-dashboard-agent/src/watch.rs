//! Widget watches.
//!
//! A watch follows the sources of one widget through a registry
//! [`Subscription`] and logs whenever the widget's readiness changes.

use crate::boards::{Board, Widget};
use crate::catalog::{widget_def, WidgetDef};
use genius_dashboard_core::{
    controller_buttons, resolve_sources, source_status, CompositeKind, PathError, Selection,
    SourceKind, SourceStatus, TopicRegistry,
};
use std::fmt;
use tokio::task::JoinHandle;

/// Readiness of every source of a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetStatus {
    /// Status per declared source, in catalog order
    pub sources: Vec<(String, SourceStatus)>,
    /// Every required source is ready
    pub ready: bool,
}

impl WidgetStatus {
    fn evaluate(def: &WidgetDef, selection: &Selection) -> Self {
        let mut ready = true;
        let sources = def
            .sources
            .iter()
            .map(|(name, source)| {
                let status = source_status(source, selection.get(name));
                if source.required && status != SourceStatus::Ready {
                    ready = false;
                }
                ((*name).to_string(), status)
            })
            .collect();
        Self { sources, ready }
    }
}

impl fmt::Display for WidgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.ready { "ready" } else { "waiting" })?;
        for (i, (name, status)) in self.sources.iter().enumerate() {
            let label = match status {
                SourceStatus::Missing => "missing",
                SourceStatus::Mismatch => "mismatch",
                SourceStatus::Ready => "ready",
            };
            let sep = if i == 0 { " (" } else { ", " };
            write!(f, "{sep}{name}: {label}")?;
        }
        if !self.sources.is_empty() {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Current readiness of a widget.
///
/// # Errors
///
/// Returns [`WatchError`] if the display is unknown or a source path is
/// malformed.
pub fn widget_status(widget: &Widget, registry: &TopicRegistry) -> Result<WidgetStatus, WatchError> {
    let def = lookup(widget)?;
    let sources = resolve_sources(&widget.sources)?;
    Ok(WidgetStatus::evaluate(&def, &registry.select_many_values(&sources)))
}

/// Spawn a task that logs readiness changes of `widget`.
///
/// The task ends when the registry is dropped.
///
/// # Errors
///
/// Returns [`WatchError`] if the display is unknown or a source path is
/// malformed.
pub fn spawn_watch(widget: &Widget, registry: &TopicRegistry) -> Result<JoinHandle<()>, WatchError> {
    let def = lookup(widget)?;
    let mut subscription = registry.subscribe(resolve_sources(&widget.sources)?);
    let name = widget.name.clone();

    Ok(tokio::spawn(async move {
        let mut last = WidgetStatus::evaluate(&def, subscription.current());
        tracing::info!(widget = %name, display = def.display, status = %last, "Watching widget");

        loop {
            let Ok(selection) = subscription.changed().await else {
                tracing::debug!(widget = %name, "Registry closed, stopping watch");
                break;
            };
            let next = WidgetStatus::evaluate(&def, selection);
            if next.ready {
                log_details(&name, &def, selection);
            }
            if next != last {
                tracing::info!(widget = %name, status = %next, "Widget status changed");
                last = next;
            }
        }
    }))
}

/// Spawn a watch for every widget of `board`.
///
/// Widgets that cannot be watched are logged and skipped.
pub fn spawn_watches(board: &Board, registry: &TopicRegistry) -> Vec<JoinHandle<()>> {
    board
        .widgets
        .iter()
        .filter_map(|widget| match spawn_watch(widget, registry) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(board = %board.name, widget = %widget.name, error = %err, "Cannot watch widget");
                None
            }
        })
        .collect()
}

fn lookup(widget: &Widget) -> Result<WidgetDef, WatchError> {
    widget_def(&widget.display).ok_or_else(|| WatchError::UnknownDisplay(widget.display.clone()))
}

fn log_details(name: &str, def: &WidgetDef, selection: &Selection) {
    for (source, source_def) in &def.sources {
        let Some(node) = selection.get(source) else {
            continue;
        };
        match &source_def.kind {
            SourceKind::Topic { .. } => {
                if let Some(message) = node.as_leaf() {
                    tracing::debug!(widget = name, source, value = %message.value, "Widget value");
                }
            }
            SourceKind::Composite(CompositeKind::Controller) => {
                let buttons = controller_buttons(node);
                tracing::debug!(widget = name, source, buttons = buttons.len(), "Controller bindings");
            }
            SourceKind::Composite(kind) => {
                tracing::debug!(widget = name, source, kind = %kind, "Composite updated");
            }
        }
    }
}

/// A widget that cannot be watched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Display id not in the catalog
    #[error("unknown display: {0}")]
    UnknownDisplay(String),
    /// A source path is malformed
    #[error(transparent)]
    Path(#[from] PathError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use genius_dashboard_core::{DataValue, Message, TopicPath};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn widget(display: &str, data: &str) -> Widget {
        widget_def(display)
            .unwrap()
            .new_widget("w", BTreeMap::from([("data".to_string(), data.to_string())]))
    }

    fn set(registry: &TopicRegistry, path: &str, value: DataValue) {
        let path = TopicPath::parse(path).unwrap();
        registry.set_topic(Message::new(path, 1, value));
    }

    #[test]
    fn status_follows_the_tree() {
        let registry = TopicRegistry::new();
        let toggle = widget("toggle", "/SmartDashboard/enabled");

        let status = widget_status(&toggle, &registry).unwrap();
        assert!(!status.ready);
        assert_eq!(status.sources, [("data".to_string(), SourceStatus::Missing)]);
        assert_eq!(status.to_string(), "waiting (data: missing)");

        set(&registry, "/SmartDashboard/enabled", DataValue::Double(1.0));
        let status = widget_status(&toggle, &registry).unwrap();
        assert_eq!(status.sources[0].1, SourceStatus::Mismatch);

        set(&registry, "/SmartDashboard/enabled", DataValue::Boolean(true));
        assert!(widget_status(&toggle, &registry).unwrap().ready);
    }

    #[test]
    fn unbound_required_source_is_missing() {
        let registry = TopicRegistry::new();
        let mut simple = widget("simple", "");
        simple.sources.clear();
        let status = widget_status(&simple, &registry).unwrap();
        assert_eq!(status.sources[0].1, SourceStatus::Missing);
    }

    #[test]
    fn unwatchable_widgets_are_errors() {
        let registry = TopicRegistry::new();
        let mut bad = widget("simple", "/a");
        bad.display = "gauge".to_string();
        assert_eq!(
            widget_status(&bad, &registry),
            Err(WatchError::UnknownDisplay("gauge".to_string()))
        );

        let bad_path = widget("simple", "no-slash");
        assert!(matches!(widget_status(&bad_path, &registry), Err(WatchError::Path(_))));
    }

    #[tokio::test]
    async fn watch_stops_when_registry_is_dropped() {
        let registry = TopicRegistry::new();
        let handle = spawn_watch(&widget("simple", "/SmartDashboard/x"), &registry).unwrap();

        set(&registry, "/SmartDashboard/x", DataValue::Int(3));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(registry);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
