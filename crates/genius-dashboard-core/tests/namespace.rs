//! End-to-end behaviour of the namespace engine through its public API.

use async_trait::async_trait;
use genius_dashboard_core::{
    classify, classify_as, source_status, Classification, CompositeKind, DataType, DataValue,
    Message, NamespaceTree, OptimisticWriter, PathError, Publisher, SourceDef, SourceStatus,
    TopicPath, TopicRegistry, TransportEvent, TransportFailure, WriteError,
};
use std::collections::BTreeMap;

fn path(s: &str) -> TopicPath {
    TopicPath::parse(s).unwrap()
}

fn message(p: &str, timestamp: u64, value: DataValue) -> Message {
    Message::new(path(p), timestamp, value)
}

struct Rejecting;

#[async_trait]
impl Publisher for Rejecting {
    async fn publish_value(&self, _: &TopicPath, _: &DataValue) -> Result<(), TransportFailure> {
        Err(TransportFailure::new("robot disconnected"))
    }
}

#[test]
fn disjoint_writes_share_structure() {
    let t1 = NamespaceTree::new()
        .set(&path("/SmartDashboard/a"), 1)
        .set(&path("/Shuffleboard/b"), 2);
    let t2 = t1.set(&path("/SmartDashboard/c"), 3);

    let before = t1.get(&path("/Shuffleboard")).unwrap();
    let after = t2.get(&path("/Shuffleboard")).unwrap();
    assert!(before.ptr_eq(after));
}

#[test]
fn set_then_get_round_trip() {
    let tree = NamespaceTree::new();
    for (p, v) in [("/a", 1), ("/a/b/c", 2), ("/x/y", 3)] {
        let tree = tree.set(&path(p), v);
        assert_eq!(tree.get(&path(p)).unwrap().as_leaf(), Some(&v));
    }
}

#[test]
fn identical_writes_compare_equal() {
    let tree = NamespaceTree::new().set(&path("/a/b"), 5);
    let again = tree.set(&path("/a/b"), 5);

    assert_eq!(tree.get(&path("/a/b")), again.get(&path("/a/b")));
    assert_eq!(tree.root(), again.root());
    assert!(!tree.root().ptr_eq(&again.root()));
}

#[test]
fn leaf_then_deeper_write_becomes_branch() {
    let tree = NamespaceTree::new()
        .set(&path("/a"), 1)
        .set(&path("/a/b"), 2);

    let a = tree.get(&path("/a")).unwrap();
    assert!(!a.is_leaf());
    assert_eq!(a.as_branch().unwrap().get("b").unwrap().as_leaf(), Some(&2));
}

#[test]
fn rollback_restores_timestamp_and_value() {
    let registry = TopicRegistry::new();
    registry.apply(TransportEvent::TopicUpdate(message(
        "/SmartDashboard/target",
        41,
        DataValue::Double(2.5),
    )));

    let writer = OptimisticWriter::new(registry.clone(), Rejecting);
    let result = tokio_test::block_on(writer.publish(&path("/SmartDashboard/target"), DataValue::Double(9.0)));

    match result {
        Err(WriteError::Transport(failure)) => assert_eq!(failure.reason, "robot disconnected"),
        other => panic!("unexpected result: {other:?}"),
    }
    let node = registry.select_value(&path("/SmartDashboard/target")).unwrap();
    let restored = node.as_leaf().unwrap();
    assert_eq!(restored.timestamp, 41);
    assert_eq!(restored.value, DataValue::Double(2.5));
}

#[test]
fn chooser_classification_completeness() {
    let required = [
        (".controllable", DataValue::Boolean(true)),
        (".instance", DataValue::Int(0)),
        (".name", DataValue::String("Auto".into())),
        (".type", DataValue::String("String Chooser".into())),
        ("active", DataValue::String("Left".into())),
        ("default", DataValue::String("Left".into())),
        ("options", DataValue::StringArray(vec!["Left".into(), "Right".into()])),
    ];

    let registry = TopicRegistry::new();
    for (name, value) in &required {
        registry.set_topic(message(&format!("/SmartDashboard/Auto/{name}"), 1, value.clone()));
    }
    let chooser = registry.select_value(&path("/SmartDashboard/Auto")).unwrap();
    assert_eq!(classify(&chooser), Classification::Composite(CompositeKind::Chooser));
    assert_eq!(
        source_status(&SourceDef::composite(CompositeKind::Chooser, "Auto"), Some(&chooser)),
        SourceStatus::Ready
    );

    for skip in 0..required.len() {
        let mut tree = NamespaceTree::new();
        for (i, (name, value)) in required.iter().enumerate() {
            if i != skip {
                let p = path(&format!("/Auto/{name}"));
                tree = tree.set(&p, Message::new(p.clone(), 1, value.clone()));
            }
        }
        let node = tree.get(&path("/Auto")).unwrap();
        assert_ne!(
            classify_as(node, CompositeKind::Chooser),
            Classification::Composite(CompositeKind::Chooser)
        );
    }
}

#[test]
fn path_parsing() {
    assert_eq!(path("/SmartDashboard/g").segments(), ["SmartDashboard", "g"]);
    assert!(matches!(TopicPath::parse("/a//b"), Err(PathError::EmptySegment { .. })));
    assert_eq!(TopicPath::parse(""), Err(PathError::Empty));
}

#[tokio::test]
async fn subscription_follows_transport_events() {
    let registry = TopicRegistry::new();
    let sources = BTreeMap::from([("data".to_string(), path("/SmartDashboard/speed"))]);
    let mut subscription = registry.subscribe(sources);
    assert!(subscription.current().get("data").is_none());

    registry.apply(TransportEvent::Connectivity(true));
    assert!(!subscription.refresh());

    registry.apply(TransportEvent::TopicUpdate(message(
        "/SmartDashboard/speed",
        1,
        DataValue::Double(3.0),
    )));
    let selection = subscription.changed().await.unwrap();
    let speed = selection.get("data").unwrap().as_leaf().unwrap();
    assert_eq!(speed.data_type(), DataType::Double);
}
