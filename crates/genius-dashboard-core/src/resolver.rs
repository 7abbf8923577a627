//! Source resolution and structural classification.
//!
//! Composite sources (choosers, cameras, commands, controllers, subsystems)
//! are published by the robot as a branch of well-known leaves. Nothing in
//! the tree tags a branch with its kind; a branch is a composite of kind `K`
//! when every required field of `K`'s schema is present as a leaf of an
//! allowed type. Extra fields are allowed and passed through.
//!
//! A shape that does not match is a classification outcome, not an error.

use crate::message::{DataType, Message};
use crate::path::{PathError, TopicPath};
use crate::tree::{Branch, Node};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The composite structures widgets can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    /// A sendable chooser
    Chooser,
    /// A camera server entry
    Camera,
    /// A command
    Command,
    /// A controller button map
    Controller,
    /// A subsystem
    Subsystem,
}

impl CompositeKind {
    /// Every kind, in the order [`classify`] tries them.
    pub const ALL: [CompositeKind; 5] = [
        CompositeKind::Chooser,
        CompositeKind::Command,
        CompositeKind::Subsystem,
        CompositeKind::Camera,
        CompositeKind::Controller,
    ];

    /// Lowercase name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeKind::Chooser => "chooser",
            CompositeKind::Camera => "camera",
            CompositeKind::Command => "command",
            CompositeKind::Controller => "controller",
            CompositeKind::Subsystem => "subsystem",
        }
    }

    /// The structural schema of this kind.
    #[must_use]
    pub fn schema(&self) -> &'static Schema {
        match self {
            CompositeKind::Chooser => &CHOOSER,
            CompositeKind::Camera => &CAMERA,
            CompositeKind::Command => &COMMAND,
            CompositeKind::Controller => &CONTROLLER,
            CompositeKind::Subsystem => &SUBSYSTEM,
        }
    }
}

impl fmt::Display for CompositeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CompositeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// A required field of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Child segment name
    pub name: &'static str,
    /// Allowed value types
    pub types: &'static [DataType],
}

/// Fields a composite must have, and optional fields it is known to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Fields that must be present as leaves of an allowed type
    pub required: &'static [FieldSpec],
    /// Optional fields that are part of the schema
    pub optional: &'static [&'static str],
}

impl Schema {
    /// Names of every field the schema knows about.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.required
            .iter()
            .map(|field| field.name)
            .chain(self.optional.iter().copied())
    }

    fn matches(&self, branch: &Branch<Message>) -> bool {
        self.required.iter().all(|spec| {
            branch
                .get(spec.name)
                .and_then(Node::as_leaf)
                .is_some_and(|message| spec.types.contains(&message.data_type()))
        })
    }
}

const fn field(name: &'static str, types: &'static [DataType]) -> FieldSpec {
    FieldSpec { name, types }
}

const BOOLEAN: &[DataType] = &[DataType::Boolean];
const INT: &[DataType] = &[DataType::Int];
const STRING: &[DataType] = &[DataType::String];
const STRING_ARRAY: &[DataType] = &[DataType::StringArray];
const ANY_ARRAY: &[DataType] = &[
    DataType::BooleanArray,
    DataType::DoubleArray,
    DataType::FloatArray,
    DataType::IntArray,
    DataType::StringArray,
];

static CHOOSER: Schema = Schema {
    required: &[
        field(".controllable", BOOLEAN),
        field(".instance", INT),
        field(".name", STRING),
        field(".type", STRING),
        field("active", STRING),
        field("default", STRING),
        field("options", ANY_ARRAY),
    ],
    optional: &["selected"],
};

static CAMERA: Schema = Schema {
    required: &[
        field("connected", BOOLEAN),
        field("description", STRING),
        field("mode", STRING),
        field("modes", STRING_ARRAY),
        field("source", STRING),
        field("streams", STRING_ARRAY),
    ],
    optional: &[],
};

static COMMAND: Schema = Schema {
    required: &[
        field(".controllable", BOOLEAN),
        field(".isParented", BOOLEAN),
        field(".name", STRING),
        field(".type", STRING),
        field("interruptBehavior", STRING),
        field("running", BOOLEAN),
        field("runsWhenDisabled", BOOLEAN),
    ],
    optional: &[],
};

// Buttons (`N-layer`, `N-command`) are open-ended and read by
// `controller_buttons`.
static CONTROLLER: Schema = Schema {
    required: &[field("buttonHelper", BOOLEAN)],
    optional: &[],
};

static SUBSYSTEM: Schema = Schema {
    required: &[
        field(".name", STRING),
        field(".type", STRING),
        field(".hasDefault", BOOLEAN),
        field(".hasCommand", BOOLEAN),
    ],
    optional: &[".default", ".command", ".controllable"],
};

/// Outcome of classifying a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A single value
    Leaf,
    /// A branch matching a composite schema
    Composite(CompositeKind),
    /// A branch matching no schema (yet)
    IncompleteBranch,
}

/// Classify a node against every composite kind, in [`CompositeKind::ALL`]
/// order.
#[must_use]
pub fn classify(node: &Node<Message>) -> Classification {
    let Node::Branch(branch) = node else {
        return Classification::Leaf;
    };
    CompositeKind::ALL
        .into_iter()
        .find(|kind| kind.schema().matches(branch))
        .map_or(Classification::IncompleteBranch, Classification::Composite)
}

/// Classify a node against a single composite kind.
#[must_use]
pub fn classify_as(node: &Node<Message>, kind: CompositeKind) -> Classification {
    match node {
        Node::Leaf(_) => Classification::Leaf,
        Node::Branch(branch) if kind.schema().matches(branch) => Classification::Composite(kind),
        Node::Branch(_) => Classification::IncompleteBranch,
    }
}

/// Leaves of a branch whose names are not in `known`, ordered by name.
///
/// Nested branches are skipped. A leaf node has no extra fields.
#[must_use]
pub fn extract_extra_fields<'a>(node: &'a Node<Message>, known: &[&str]) -> Vec<(String, &'a Message)> {
    let Some(branch) = node.as_branch() else {
        return Vec::new();
    };
    branch
        .children()
        .filter(|(name, _)| !known.contains(name))
        .filter_map(|(name, child)| child.as_leaf().map(|message| (name.to_string(), message)))
        .collect()
}

/// What a widget source binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A single topic of one of the listed types; empty means any type
    Topic {
        /// Accepted value types
        types: Vec<DataType>,
    },
    /// A composite branch
    Composite(CompositeKind),
}

/// Declaration of one widget source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDef {
    /// What the source binds to
    pub kind: SourceKind,
    /// Whether the widget cannot render without it
    pub required: bool,
    /// Shown to the user when configuring the widget
    pub description: &'static str,
}

impl SourceDef {
    /// A required topic source.
    #[must_use]
    pub fn topic(types: &[DataType], description: &'static str) -> Self {
        Self {
            kind: SourceKind::Topic {
                types: types.to_vec(),
            },
            required: true,
            description,
        }
    }

    /// A required composite source.
    #[must_use]
    pub fn composite(kind: CompositeKind, description: &'static str) -> Self {
        Self {
            kind: SourceKind::Composite(kind),
            required: true,
            description,
        }
    }

    /// Mark the source as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Readiness of a source against the current tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// Nothing at the path yet
    Missing,
    /// Something is there, but not of the declared shape or type
    Mismatch,
    /// Ready to render
    Ready,
}

/// Check a selected node against a source declaration.
#[must_use]
pub fn source_status(def: &SourceDef, node: Option<&Node<Message>>) -> SourceStatus {
    let Some(node) = node else {
        return SourceStatus::Missing;
    };
    let ready = match &def.kind {
        SourceKind::Topic { types } => node
            .as_leaf()
            .is_some_and(|message| types.is_empty() || types.contains(&message.data_type())),
        SourceKind::Composite(kind) => classify_as(node, *kind) == Classification::Composite(*kind),
    };
    if ready {
        SourceStatus::Ready
    } else {
        SourceStatus::Mismatch
    }
}

/// Parse a widget's stored source strings into paths.
///
/// Empty strings are unset optional sources and are left out.
///
/// # Errors
///
/// Returns [`PathError`] for the first malformed path.
pub fn resolve_sources(sources: &BTreeMap<String, String>) -> Result<BTreeMap<String, TopicPath>, PathError> {
    sources
        .iter()
        .filter(|(_, path)| !path.is_empty())
        .map(|(name, path)| TopicPath::parse(path).map(|path| (name.clone(), path)))
        .collect()
}

/// The path a widget writes to for a source bound at `base`.
///
/// Choosers are written through their `selected` child.
///
/// # Errors
///
/// Never fails for the built-in kinds; the error is that of
/// [`TopicPath::child`].
pub fn write_target(kind: &SourceKind, base: &TopicPath) -> Result<TopicPath, PathError> {
    match kind {
        SourceKind::Composite(CompositeKind::Chooser) => base.child("selected"),
        _ => Ok(base.clone()),
    }
}

/// One button of a controller composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerButton {
    /// Button number
    pub number: u32,
    /// Layer the binding belongs to
    pub layer: i64,
    /// Name of the bound command
    pub command: String,
}

/// Buttons of a controller branch, ordered by number.
///
/// A button needs both `N-layer` (int) and `N-command` (string).
#[must_use]
pub fn controller_buttons(node: &Node<Message>) -> Vec<ControllerButton> {
    let Some(branch) = node.as_branch() else {
        return Vec::new();
    };

    let mut buttons: Vec<ControllerButton> = branch
        .children()
        .filter_map(|(name, child)| {
            let number = name.strip_suffix("-layer")?.parse::<u32>().ok()?;
            let layer = child.as_leaf()?.value.as_int()?;
            let command = branch
                .get(&format!("{number}-command"))?
                .as_leaf()?
                .value
                .as_str()?
                .to_string();
            Some(ControllerButton {
                number,
                layer,
                command,
            })
        })
        .collect();
    buttons.sort_by_key(|button| button.number);
    buttons
}

/// Unknown composite kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown composite kind: {0}")]
pub struct UnknownKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DataValue;
    use crate::tree::NamespaceTree;

    fn path(s: &str) -> TopicPath {
        TopicPath::parse(s).unwrap()
    }

    fn with(tree: NamespaceTree<Message>, p: &str, value: DataValue) -> NamespaceTree<Message> {
        let p = path(p);
        let message = Message::new(p.clone(), 1, value);
        tree.set(&p, message)
    }

    fn chooser_fields() -> Vec<(&'static str, DataValue)> {
        vec![
            (".controllable", DataValue::Boolean(true)),
            (".instance", DataValue::Int(0)),
            (".name", DataValue::String("Auto".into())),
            (".type", DataValue::String("String Chooser".into())),
            ("active", DataValue::String("Left".into())),
            ("default", DataValue::String("Left".into())),
            ("options", DataValue::StringArray(vec!["Left".into(), "Right".into()])),
        ]
    }

    fn chooser_tree(skip: Option<&str>) -> NamespaceTree<Message> {
        chooser_fields()
            .into_iter()
            .filter(|(name, _)| Some(*name) != skip)
            .fold(NamespaceTree::new(), |tree, (name, value)| {
                with(tree, &format!("/SmartDashboard/Auto/{name}"), value)
            })
    }

    #[test]
    fn complete_chooser_classifies() {
        let tree = chooser_tree(None);
        let node = tree.get(&path("/SmartDashboard/Auto")).unwrap();
        assert_eq!(classify(node), Classification::Composite(CompositeKind::Chooser));
    }

    #[test]
    fn chooser_missing_any_required_field_does_not_classify() {
        for (name, _) in chooser_fields() {
            let tree = chooser_tree(Some(name));
            let node = tree.get(&path("/SmartDashboard/Auto")).unwrap();
            assert_eq!(
                classify_as(node, CompositeKind::Chooser),
                Classification::IncompleteBranch,
                "still a chooser without {name}"
            );
        }
    }

    #[test]
    fn wrong_field_type_does_not_classify() {
        let tree = with(chooser_tree(None), "/SmartDashboard/Auto/.instance", DataValue::Double(0.0));
        let node = tree.get(&path("/SmartDashboard/Auto")).unwrap();
        assert_eq!(classify(node), Classification::IncompleteBranch);
    }

    #[test]
    fn leaf_classifies_as_leaf() {
        let tree = with(NamespaceTree::new(), "/x", DataValue::Int(1));
        assert_eq!(classify(tree.get(&path("/x")).unwrap()), Classification::Leaf);
    }

    #[test]
    fn subsystem_and_controller() {
        let tree = [
            ("/Drive/.name", DataValue::String("Drive".into())),
            ("/Drive/.type", DataValue::String("Subsystem".into())),
            ("/Drive/.hasDefault", DataValue::Boolean(true)),
            ("/Drive/.hasCommand", DataValue::Boolean(false)),
            ("/Pad/buttonHelper", DataValue::Boolean(true)),
        ]
        .into_iter()
        .fold(NamespaceTree::new(), |tree, (p, v)| with(tree, p, v));

        assert_eq!(
            classify(tree.get(&path("/Drive")).unwrap()),
            Classification::Composite(CompositeKind::Subsystem)
        );
        assert_eq!(
            classify(tree.get(&path("/Pad")).unwrap()),
            Classification::Composite(CompositeKind::Controller)
        );
    }

    #[test]
    fn extra_fields_exclude_known_and_branches() {
        let tree = with(chooser_tree(None), "/SmartDashboard/Auto/zeta", DataValue::Int(3));
        let tree = with(tree, "/SmartDashboard/Auto/alpha", DataValue::Boolean(false));
        let tree = with(tree, "/SmartDashboard/Auto/nested/x", DataValue::Int(1));
        let node = tree.get(&path("/SmartDashboard/Auto")).unwrap();

        let known: Vec<&str> = CompositeKind::Chooser.schema().field_names().collect();
        let extra = extract_extra_fields(node, &known);
        let names: Vec<&str> = extra.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert_eq!(extra[1].1.value, DataValue::Int(3));
    }

    #[test]
    fn source_status_states() {
        let tree = with(NamespaceTree::new(), "/speed", DataValue::Double(1.0));
        let number = SourceDef::topic(&[DataType::Double, DataType::Int], "Number to show");
        let text = SourceDef::topic(&[DataType::String], "Text to show");
        let chooser = SourceDef::composite(CompositeKind::Chooser, "Chooser");

        let speed = tree.get(&path("/speed"));
        assert_eq!(source_status(&number, speed), SourceStatus::Ready);
        assert_eq!(source_status(&text, speed), SourceStatus::Mismatch);
        assert_eq!(source_status(&chooser, speed), SourceStatus::Mismatch);
        assert_eq!(source_status(&number, None), SourceStatus::Missing);
    }

    #[test]
    fn resolve_sources_skips_unset() {
        let sources = BTreeMap::from([
            ("data".to_string(), "/SmartDashboard/x".to_string()),
            ("label".to_string(), String::new()),
        ]);
        let resolved = resolve_sources(&sources).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["data"], path("/SmartDashboard/x"));

        let bad = BTreeMap::from([("data".to_string(), "SmartDashboard".to_string())]);
        assert!(resolve_sources(&bad).is_err());
    }

    #[test]
    fn chooser_writes_to_selected() {
        let base = path("/SmartDashboard/Auto");
        let chooser = SourceKind::Composite(CompositeKind::Chooser);
        let topic = SourceKind::Topic { types: vec![] };

        assert_eq!(write_target(&chooser, &base).unwrap(), path("/SmartDashboard/Auto/selected"));
        assert_eq!(write_target(&topic, &base).unwrap(), base);
    }

    #[test]
    fn controller_buttons_sorted_by_number() {
        let tree = [
            ("/Pad/buttonHelper", DataValue::Boolean(true)),
            ("/Pad/10-layer", DataValue::Int(1)),
            ("/Pad/10-command", DataValue::String("Shoot".into())),
            ("/Pad/2-layer", DataValue::Int(0)),
            ("/Pad/2-command", DataValue::String("Intake".into())),
            ("/Pad/3-layer", DataValue::Int(0)),
        ]
        .into_iter()
        .fold(NamespaceTree::new(), |tree, (p, v)| with(tree, p, v));

        let buttons = controller_buttons(tree.get(&path("/Pad")).unwrap());
        assert_eq!(
            buttons,
            [
                ControllerButton {
                    number: 2,
                    layer: 0,
                    command: "Intake".into()
                },
                ControllerButton {
                    number: 10,
                    layer: 1,
                    command: "Shoot".into()
                },
            ]
        );
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in CompositeKind::ALL {
            assert_eq!(kind.as_str().parse::<CompositeKind>().unwrap(), kind);
        }
        assert!("widget".parse::<CompositeKind>().is_err());
    }
}
