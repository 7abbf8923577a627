//! The topic registry: single owner of the value and announcement trees.
//!
//! The registry publishes immutable [`Snapshot`]s through a `watch` channel.
//! Mutations replace the snapshot and never wait on readers; a reader holding
//! an older snapshot keeps a consistent view because trees are persistent.
//!
//! Consumers do not hold the registry's state directly. They either read a
//! selection on demand ([`TopicRegistry::select_value`],
//! [`TopicRegistry::select_many_values`]) or keep a [`Subscription`] that
//! recomputes once per registry update and reports a change only when one
//! of its selected nodes is a different allocation.

use crate::message::{Message, Topic};
use crate::path::TopicPath;
use crate::transport::TransportEvent;
use crate::tree::{NamespaceTree, Node};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

/// An immutable view of the registry at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Latest value per topic
    pub values: NamespaceTree<Message>,
    /// Announced topic metadata
    pub announcements: NamespaceTree<Topic>,
    /// Whether the transport last reported being connected
    pub connected: bool,
    /// Number of mutations applied so far
    pub revision: u64,
}

/// Shared handle to the registry.
///
/// Cloning the handle does not copy any state. The registry lives as long as
/// any handle does.
#[derive(Debug, Clone)]
pub struct TopicRegistry {
    state: Arc<watch::Sender<Snapshot>>,
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicRegistry {
    /// Create a registry with empty trees.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Store a value update.
    pub fn set_topic(&self, message: Message) {
        let path = message.path.clone();
        self.state.send_modify(|snapshot| {
            snapshot.values = snapshot.values.set(&path, message);
            snapshot.revision += 1;
        });
        tracing::trace!(%path, "Set topic value");
    }

    /// Store announced metadata for a topic.
    pub fn set_announced_topic(&self, topic: Topic) {
        let path = topic.name.clone();
        let data_type = topic.data_type;
        self.state.send_modify(|snapshot| {
            snapshot.announcements = snapshot.announcements.set(&path, topic);
            snapshot.revision += 1;
        });
        tracing::debug!(%path, %data_type, "Topic announced");
    }

    /// Apply an event delivered by the transport.
    ///
    /// Connectivity changes are recorded but never touch the trees.
    pub fn apply(&self, event: TransportEvent) {
        match event {
            TransportEvent::TopicUpdate(message) => self.set_topic(message),
            TransportEvent::TopicAnnounce(topic) => self.set_announced_topic(topic),
            TransportEvent::Connectivity(connected) => {
                let changed = self.state.send_if_modified(|snapshot| {
                    if snapshot.connected == connected {
                        return false;
                    }
                    snapshot.connected = connected;
                    snapshot.revision += 1;
                    true
                });
                if changed {
                    tracing::info!(connected, "Transport connectivity changed");
                }
            }
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    /// The value node at `path`.
    #[must_use]
    pub fn select_value(&self, path: &TopicPath) -> Option<Node<Message>> {
        self.state.borrow().values.get(path).cloned()
    }

    /// The value nodes for several named sources, read from one snapshot.
    #[must_use]
    pub fn select_many_values(&self, sources: &BTreeMap<String, TopicPath>) -> Selection {
        Selection::select(&self.state.borrow().values, sources)
    }

    /// The announcement node at `path`.
    #[must_use]
    pub fn select_announcement(&self, path: &TopicPath) -> Option<Node<Topic>> {
        self.state.borrow().announcements.get(path).cloned()
    }

    /// Subscribe to a set of named sources.
    #[must_use]
    pub fn subscribe(&self, sources: BTreeMap<String, TopicPath>) -> Subscription {
        let mut receiver = self.state.subscribe();
        let current = Selection::select(&receiver.borrow_and_update().values, &sources);
        Subscription {
            receiver,
            sources,
            current,
        }
    }
}

/// Value nodes selected for named sources.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    entries: BTreeMap<String, Option<Node<Message>>>,
}

impl Selection {
    fn select(values: &NamespaceTree<Message>, sources: &BTreeMap<String, TopicPath>) -> Self {
        let entries = sources
            .iter()
            .map(|(name, path)| (name.clone(), values.get(path).cloned()))
            .collect();
        Self { entries }
    }

    /// The node selected for a source, if the source exists and resolved.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node<Message>> {
        self.entries.get(name).and_then(Option::as_ref)
    }

    /// Iterate over every source and its node.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Node<Message>>)> {
        self.entries
            .iter()
            .map(|(name, node)| (name.as_str(), node.as_ref()))
    }

    /// Shallow comparison: same sources, and each node is the same
    /// allocation (or absent in both).
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|((name_a, a), (name_b, b))| {
                    name_a == name_b
                        && match (a, b) {
                            (Some(a), Some(b)) => a.ptr_eq(b),
                            (None, None) => true,
                            _ => false,
                        }
                })
    }
}

/// A memoized selection over the registry.
#[derive(Debug)]
pub struct Subscription {
    receiver: watch::Receiver<Snapshot>,
    sources: BTreeMap<String, TopicPath>,
    current: Selection,
}

impl Subscription {
    /// The selection as of the last refresh.
    #[must_use]
    pub fn current(&self) -> &Selection {
        &self.current
    }

    /// The sources this subscription selects.
    #[must_use]
    pub fn sources(&self) -> &BTreeMap<String, TopicPath> {
        &self.sources
    }

    /// Recompute against the latest snapshot.
    ///
    /// Returns `true` if any selected node changed by reference.
    pub fn refresh(&mut self) -> bool {
        let next = Selection::select(&self.receiver.borrow_and_update().values, &self.sources);
        if next.same_as(&self.current) {
            return false;
        }
        self.current = next;
        true
    }

    /// Wait until a registry update changes this selection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryClosed`] once every registry handle is dropped.
    pub async fn changed(&mut self) -> Result<&Selection, RegistryClosed> {
        loop {
            self.receiver.changed().await.map_err(|_| RegistryClosed)?;
            if self.refresh() {
                return Ok(&self.current);
            }
        }
    }
}

/// The registry was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("topic registry closed")]
pub struct RegistryClosed;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DataType, DataValue};
    use std::time::Duration;

    fn path(s: &str) -> TopicPath {
        TopicPath::parse(s).unwrap()
    }

    fn message(p: &str, timestamp: u64, value: DataValue) -> Message {
        Message::new(path(p), timestamp, value)
    }

    fn sources(entries: &[(&str, &str)]) -> BTreeMap<String, TopicPath> {
        entries
            .iter()
            .map(|(name, p)| ((*name).to_string(), path(p)))
            .collect()
    }

    #[test]
    fn set_topic_is_visible() {
        let registry = TopicRegistry::new();
        registry.set_topic(message("/SmartDashboard/x", 1, DataValue::Int(10)));

        let node = registry.select_value(&path("/SmartDashboard/x")).unwrap();
        assert_eq!(node.as_leaf().unwrap().value, DataValue::Int(10));
        assert!(registry.select_value(&path("/SmartDashboard/y")).is_none());
        assert_eq!(registry.snapshot().revision, 1);
    }

    #[test]
    fn announcements_are_separate() {
        let registry = TopicRegistry::new();
        registry.set_announced_topic(Topic::new(path("/a/b"), 3, DataType::Double));

        assert!(registry.select_value(&path("/a/b")).is_none());
        let topic = registry.select_announcement(&path("/a/b")).unwrap();
        assert_eq!(topic.as_leaf().unwrap().id, 3);
    }

    #[test]
    fn select_many_reads_one_snapshot() {
        let registry = TopicRegistry::new();
        registry.set_topic(message("/a", 1, DataValue::Boolean(true)));

        let selection = registry.select_many_values(&sources(&[("on", "/a"), ("off", "/b")]));
        assert!(selection.get("on").is_some());
        assert!(selection.get("off").is_none());
        assert_eq!(selection.iter().count(), 2);
    }

    #[test]
    fn subscription_ignores_unrelated_updates() {
        let registry = TopicRegistry::new();
        registry.set_topic(message("/Drive/left", 1, DataValue::Double(0.0)));
        registry.set_topic(message("/Arm/angle", 1, DataValue::Double(0.0)));

        let mut subscription = registry.subscribe(sources(&[("drive", "/Drive")]));
        assert!(!subscription.refresh());

        registry.set_topic(message("/Arm/angle", 2, DataValue::Double(1.0)));
        assert!(!subscription.refresh());

        registry.set_topic(message("/Drive/right", 1, DataValue::Double(0.5)));
        assert!(subscription.refresh());
        let drive = subscription.current().get("drive").unwrap();
        assert_eq!(drive.as_branch().unwrap().len(), 2);
    }

    #[test]
    fn connectivity_does_not_touch_trees() {
        let registry = TopicRegistry::new();
        registry.set_topic(message("/a", 1, DataValue::Int(1)));
        let before = registry.snapshot();

        registry.apply(TransportEvent::Connectivity(true));
        registry.apply(TransportEvent::Connectivity(true));

        let after = registry.snapshot();
        assert!(after.connected);
        assert_eq!(after.revision, before.revision + 1);
        assert!(after.values.root().ptr_eq(&before.values.root()));
    }

    #[tokio::test]
    async fn changed_wakes_only_for_selected_subtree() {
        let registry = TopicRegistry::new();
        let mut subscription = registry.subscribe(sources(&[("speed", "/Drive/speed")]));

        let writer = registry.clone();
        tokio::spawn(async move {
            writer.set_topic(message("/Arm/angle", 1, DataValue::Double(1.0)));
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.set_topic(message("/Drive/speed", 1, DataValue::Double(2.0)));
        });

        let selection = tokio::time::timeout(Duration::from_secs(1), subscription.changed())
            .await
            .expect("timed out")
            .unwrap();
        let speed = selection.get("speed").unwrap().as_leaf().unwrap();
        assert_eq!(speed.value, DataValue::Double(2.0));
    }
}
