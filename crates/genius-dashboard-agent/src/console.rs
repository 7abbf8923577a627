//! Operator console.
//!
//! One command per line on stdin. Topic commands read the registry or write
//! through the optimistic writer; board commands edit the board store.

use crate::boards::{BoardError, BoardPatch, BoardStore};
use crate::catalog::{widget_def, DISPLAYS};
use crate::watch::widget_status;
use genius_dashboard_core::{
    classify, classify_as, controller_buttons, extract_extra_fields, write_target, Classification,
    CompositeKind, DataValue, Message, Node, OptimisticWriter, PathError, Publisher, SourceKind,
    TopicPath, TopicRegistry, UnknownKind, ValueParseError, WriteError,
};
use std::collections::BTreeMap;

const HELP: &str = "\
Topics:
  get <path>                       show a value or branch
  tree [path]                      show the value tree
  set <path> <value>               write a value (chooser branches write their selection)
  classify <path> [kind]           show what a branch is, or check it against one kind
  announce <path>                  show announced topic metadata
Boards:
  boards                           list boards
  board <name>                     show a board, creating it if missing
  widgets                          list widgets of the current board
  add <display> <name> [src=path]  add a widget to the current board
  remove <name>                    remove a widget from the current board
  help                             show this help";

const ADD_USAGE: &str = "add <display> <name> [source=path ...]";

const CLASSIFY_USAGE: &str = "classify <path> [chooser|camera|command|controller|subsystem]";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the node at a path
    Get(TopicPath),
    /// Show the value tree, or a subtree
    Tree(Option<TopicPath>),
    /// Write a value given as text
    Set {
        /// Target path
        path: TopicPath,
        /// Unparsed value
        value: String,
    },
    /// Classify the node at a path, optionally against a single kind
    Classify(TopicPath, Option<CompositeKind>),
    /// Show announced metadata
    Announce(TopicPath),
    /// List boards
    Boards,
    /// Switch boards
    Board(String),
    /// List widgets of the current board
    Widgets,
    /// Add a widget to the current board
    Add {
        /// Catalog display id
        display: String,
        /// Widget name
        name: String,
        /// Source name to topic path
        sources: BTreeMap<String, String>,
    },
    /// Remove a widget from the current board
    Remove(String),
    /// Show the command list
    Help,
}

/// Parse one console line.
///
/// # Errors
///
/// Returns [`ConsoleError`] for unknown commands, missing arguments and
/// malformed paths.
pub fn parse_command(line: &str) -> Result<Command, ConsoleError> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word {
        "get" => Command::Get(path_arg(rest, "get <path>")?),
        "tree" if rest.is_empty() => Command::Tree(None),
        "tree" => Command::Tree(Some(TopicPath::parse(rest)?)),
        "set" => {
            let (path, value) = rest
                .split_once(char::is_whitespace)
                .ok_or(ConsoleError::Usage("set <path> <value>"))?;
            Command::Set {
                path: TopicPath::parse(path)?,
                value: value.trim().to_string(),
            }
        }
        "classify" => {
            let mut args = rest.split_whitespace();
            let path = path_arg(args.next().unwrap_or(""), CLASSIFY_USAGE)?;
            let kind = args.next().map(str::parse::<CompositeKind>).transpose()?;
            if args.next().is_some() {
                return Err(ConsoleError::Usage(CLASSIFY_USAGE));
            }
            Command::Classify(path, kind)
        }
        "announce" => Command::Announce(path_arg(rest, "announce <path>")?),
        "boards" => Command::Boards,
        "board" if rest.is_empty() => return Err(ConsoleError::Usage("board <name>")),
        "board" => Command::Board(rest.to_string()),
        "widgets" => Command::Widgets,
        "add" => {
            let mut args = rest.split_whitespace();
            let (Some(display), Some(name)) = (args.next(), args.next()) else {
                return Err(ConsoleError::Usage(ADD_USAGE));
            };
            let sources = args
                .map(|arg| {
                    arg.split_once('=')
                        .map(|(source, path)| (source.to_string(), path.to_string()))
                        .ok_or(ConsoleError::Usage(ADD_USAGE))
                })
                .collect::<Result<_, _>>()?;
            Command::Add {
                display: display.to_string(),
                name: name.to_string(),
                sources,
            }
        }
        "remove" if rest.is_empty() => return Err(ConsoleError::Usage("remove <name>")),
        "remove" => Command::Remove(rest.to_string()),
        "help" => Command::Help,
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

fn path_arg(rest: &str, usage: &'static str) -> Result<TopicPath, ConsoleError> {
    if rest.is_empty() {
        return Err(ConsoleError::Usage(usage));
    }
    Ok(TopicPath::parse(rest)?)
}

/// Output of a console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text to print
    pub text: String,
    /// The board store was modified and should be saved
    pub boards_changed: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            boards_changed: false,
        }
    }

    fn boards(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            boards_changed: true,
        }
    }
}

/// Executes console commands against a registry and a board store.
pub struct Console<P> {
    writer: OptimisticWriter<P>,
}

impl<P: Publisher> Console<P> {
    /// Create a console writing through `writer`.
    #[must_use]
    pub fn new(writer: OptimisticWriter<P>) -> Self {
        Self { writer }
    }

    fn registry(&self) -> &TopicRegistry {
        self.writer.registry()
    }

    /// Run one command.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError`] when the command cannot be carried out.
    pub async fn execute(&self, command: Command, boards: &mut BoardStore) -> Result<Reply, ConsoleError> {
        match command {
            Command::Get(path) => self.get(&path).map(Reply::text),
            Command::Tree(path) => self.tree(path.as_ref()).map(Reply::text),
            Command::Set { path, value } => self.set(&path, &value).await.map(Reply::text),
            Command::Classify(path, kind) => self.classify(&path, kind).map(Reply::text),
            Command::Announce(path) => self.announce(&path).map(Reply::text),
            Command::Boards => Ok(Reply::text(list_boards(boards))),
            Command::Board(name) => {
                if !boards.boards.contains_key(&name) {
                    boards.set_board(&name, BoardPatch::default());
                }
                boards.set_current_board(name.clone());
                Ok(Reply::boards(format!("showing board {name}")))
            }
            Command::Widgets => self.widgets(boards).map(Reply::text),
            Command::Add {
                display,
                name,
                sources,
            } => add_widget(boards, &display, name, sources).map(Reply::boards),
            Command::Remove(name) => {
                let board = boards.current_board.clone();
                boards.remove_widget(&board, &name)?;
                Ok(Reply::boards(format!("removed {name}")))
            }
            Command::Help => Ok(Reply::text(HELP)),
        }
    }

    fn node(&self, path: &TopicPath) -> Result<Node<Message>, ConsoleError> {
        self.registry()
            .select_value(path)
            .ok_or_else(|| ConsoleError::NoTopic(path.clone()))
    }

    fn get(&self, path: &TopicPath) -> Result<String, ConsoleError> {
        let text = match self.node(path)? {
            Node::Leaf(message) => format!(
                "{path} = {} ({}) @ {}",
                message.value,
                message.data_type(),
                message.timestamp
            ),
            Node::Branch(branch) => {
                let children: Vec<&str> = branch.children().map(|(name, _)| name).collect();
                format!("{path}/ [{}]", children.join(", "))
            }
        };
        Ok(text)
    }

    fn tree(&self, path: Option<&TopicPath>) -> Result<String, ConsoleError> {
        let mut lines = Vec::new();
        match path {
            Some(path) => render(path.name(), &self.node(path)?, 0, &mut lines),
            None => {
                let snapshot = self.registry().snapshot();
                if snapshot.values.is_empty() {
                    return Ok("(no topics)".to_string());
                }
                for (name, node) in snapshot.values.root_branch().children() {
                    render(name, node, 0, &mut lines);
                }
            }
        }
        Ok(lines.join("\n"))
    }

    async fn set(&self, path: &TopicPath, text: &str) -> Result<String, ConsoleError> {
        let mut target = path.clone();
        if classify(&self.node(path)?) == Classification::Composite(CompositeKind::Chooser) {
            target = write_target(&SourceKind::Composite(CompositeKind::Chooser), path)?;
            if self.registry().select_value(&target).is_none() {
                return Err(ConsoleError::NoSelection(path.clone()));
            }
        }

        let current = self.node(&target)?;
        let message = current
            .as_leaf()
            .ok_or_else(|| WriteError::NotALeaf { path: target.clone() })?;
        let value = DataValue::parse_as(message.data_type(), text)?;

        self.writer.publish(&target, value.clone()).await?;
        Ok(format!("{target} = {value}"))
    }

    fn classify(&self, path: &TopicPath, kind: Option<CompositeKind>) -> Result<String, ConsoleError> {
        let node = self.node(path)?;
        let classification = match kind {
            Some(kind) => classify_as(&node, kind),
            None => classify(&node),
        };
        let text = match classification {
            Classification::Leaf => format!("{path}: leaf"),
            Classification::IncompleteBranch => format!("{path}: incomplete branch"),
            Classification::Composite(kind) => {
                let known: Vec<&str> = kind.schema().field_names().collect();
                let mut lines = vec![format!("{path}: {kind}")];
                if kind == CompositeKind::Controller {
                    for button in controller_buttons(&node) {
                        lines.push(format!(
                            "  button {} -> {} (layer {})",
                            button.number, button.command, button.layer
                        ));
                    }
                }
                for (name, message) in extract_extra_fields(&node, &known) {
                    lines.push(format!("  extra {name} = {}", message.value));
                }
                lines.join("\n")
            }
        };
        Ok(text)
    }

    fn announce(&self, path: &TopicPath) -> Result<String, ConsoleError> {
        let node = self
            .registry()
            .select_announcement(path)
            .ok_or_else(|| ConsoleError::NoTopic(path.clone()))?;
        let Some(topic) = node.as_leaf() else {
            return Err(ConsoleError::NoTopic(path.clone()));
        };

        let mut parts = vec![
            topic.name.to_string(),
            format!("id={}", topic.id),
            format!("type={}", topic.data_type),
        ];
        if let Some(pubuid) = topic.pubuid {
            parts.push(format!("pubuid={pubuid}"));
        }
        if let Some(properties) = &topic.properties {
            if let Some(persistent) = properties.persistent {
                parts.push(format!("persistent={persistent}"));
            }
            if let Some(retained) = properties.retained {
                parts.push(format!("retained={retained}"));
            }
        }
        Ok(parts.join(" "))
    }

    fn widgets(&self, boards: &BoardStore) -> Result<String, ConsoleError> {
        let board = boards
            .current()
            .ok_or_else(|| BoardError::UnknownBoard(boards.current_board.clone()))?;
        if board.widgets.is_empty() {
            return Ok(format!("{}: no widgets", board.name));
        }

        let mut lines = Vec::with_capacity(board.widgets.len());
        for widget in &board.widgets {
            let status = match widget_status(widget, self.registry()) {
                Ok(status) => status.to_string(),
                Err(err) => err.to_string(),
            };
            lines.push(format!(
                "{} [{}] at ({}, {}): {status}",
                widget.name, widget.display, widget.x, widget.y
            ));
        }
        Ok(lines.join("\n"))
    }
}

fn render(name: &str, node: &Node<Message>, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Leaf(message) => lines.push(format!("{indent}{name} = {}", message.value)),
        Node::Branch(branch) => {
            lines.push(format!("{indent}{name}/"));
            for (child, node) in branch.children() {
                render(child, node, depth + 1, lines);
            }
        }
    }
}

fn list_boards(boards: &BoardStore) -> String {
    if boards.boards.is_empty() {
        return "(no boards)".to_string();
    }
    boards
        .boards
        .values()
        .map(|board| {
            let marker = if board.name == boards.current_board { "*" } else { " " };
            format!("{marker} {} ({} widgets)", board.name, board.widgets.len())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn add_widget(
    boards: &mut BoardStore,
    display: &str,
    name: String,
    sources: BTreeMap<String, String>,
) -> Result<String, ConsoleError> {
    let def = widget_def(display).ok_or_else(|| ConsoleError::UnknownDisplay {
        display: display.to_string(),
        known: DISPLAYS.join(", "),
    })?;
    if let Some(source) = sources.keys().find(|source| def.source(source).is_none()) {
        return Err(ConsoleError::UnknownSource {
            display: def.display,
            source_name: source.clone(),
        });
    }
    for path in sources.values() {
        TopicPath::parse(path)?;
    }

    let board = boards.current_board.clone();
    boards.add_widget(&board, def.new_widget(name.clone(), sources))?;
    Ok(format!("added {name} to {board}"))
}

/// Errors reported to the console user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConsoleError {
    /// Wrong arguments
    #[error("usage: {0}")]
    Usage(&'static str),
    /// Not a console command
    #[error("unknown command {0:?}; try help")]
    UnknownCommand(String),
    /// Nothing at the path
    #[error("no topic at {0}")]
    NoTopic(TopicPath),
    /// A chooser that has not published a selection topic
    #[error("chooser {0} has no selected topic yet; the robot must publish one before it can be set")]
    NoSelection(TopicPath),
    /// Not a composite kind name
    #[error(transparent)]
    Kind(#[from] UnknownKind),
    /// Display id not in the catalog
    #[error("unknown display {display:?}; known displays: {known}")]
    UnknownDisplay {
        /// Requested display
        display: String,
        /// Catalog display ids
        known: String,
    },
    /// Display has no source of that name
    #[error("display {display} has no source {source_name:?}")]
    UnknownSource {
        /// Display id
        display: &'static str,
        /// Requested source
        source_name: String,
    },
    /// Malformed path
    #[error(transparent)]
    Path(#[from] PathError),
    /// Text is not a value of the topic's type
    #[error(transparent)]
    Value(#[from] ValueParseError),
    /// The write was rejected
    #[error(transparent)]
    Write(#[from] WriteError),
    /// Board edit failed
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use genius_dashboard_core::{DataType, Topic, TransportFailure};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recording {
        writes: Mutex<Vec<(TopicPath, DataValue)>>,
    }

    #[async_trait]
    impl Publisher for Recording {
        async fn publish_value(&self, path: &TopicPath, value: &DataValue) -> Result<(), TransportFailure> {
            self.writes.lock().unwrap().push((path.clone(), value.clone()));
            Ok(())
        }
    }

    fn path(s: &str) -> TopicPath {
        TopicPath::parse(s).unwrap()
    }

    type TestConsole = Console<Arc<Recording>>;

    fn console() -> TestConsole {
        recording_console().0
    }

    fn recording_console() -> (TestConsole, Arc<Recording>) {
        let publisher = Arc::new(Recording::default());
        let console = Console::new(OptimisticWriter::new(TopicRegistry::new(), Arc::clone(&publisher)));
        (console, publisher)
    }

    fn set(console: &TestConsole, p: &str, value: DataValue) {
        console.registry().set_topic(Message::new(path(p), 5, value));
    }

    fn run(console: &TestConsole, line: &str, boards: &mut BoardStore) -> Result<Reply, ConsoleError> {
        let command = parse_command(line)?;
        tokio_test::block_on(console.execute(command, boards))
    }

    #[test]
    fn parse_topic_commands() {
        assert_eq!(parse_command("get /a/b").unwrap(), Command::Get(path("/a/b")));
        assert_eq!(parse_command("  tree ").unwrap(), Command::Tree(None));
        assert_eq!(
            parse_command("set /SmartDashboard/name hello world").unwrap(),
            Command::Set {
                path: path("/SmartDashboard/name"),
                value: "hello world".to_string()
            }
        );
        assert_eq!(parse_command("get"), Err(ConsoleError::Usage("get <path>")));
        assert!(matches!(parse_command("get a/b"), Err(ConsoleError::Path(_))));
        assert!(matches!(parse_command("fly"), Err(ConsoleError::UnknownCommand(_))));
    }

    #[test]
    fn parse_board_commands() {
        assert_eq!(
            parse_command("add toggle enabled data=/SmartDashboard/enabled").unwrap(),
            Command::Add {
                display: "toggle".to_string(),
                name: "enabled".to_string(),
                sources: BTreeMap::from([("data".to_string(), "/SmartDashboard/enabled".to_string())]),
            }
        );
        assert!(matches!(parse_command("add toggle"), Err(ConsoleError::Usage(_))));
        assert!(matches!(parse_command("add toggle x data"), Err(ConsoleError::Usage(_))));
        assert_eq!(parse_command("board Auto").unwrap(), Command::Board("Auto".to_string()));
    }

    #[test]
    fn get_and_tree() {
        let console = console();
        let mut boards = BoardStore::default();
        set(&console, "/SmartDashboard/speed", DataValue::Double(1.5));
        set(&console, "/SmartDashboard/arm/angle", DataValue::Int(30));

        let reply = run(&console, "get /SmartDashboard/speed", &mut boards).unwrap();
        assert_eq!(reply.text, "/SmartDashboard/speed = 1.50 (double) @ 5");
        assert!(!reply.boards_changed);

        let reply = run(&console, "tree", &mut boards).unwrap();
        assert_eq!(reply.text, "SmartDashboard/\n  arm/\n    angle = 30\n  speed = 1.50");

        assert_eq!(
            run(&console, "get /Missing", &mut boards),
            Err(ConsoleError::NoTopic(path("/Missing")))
        );
    }

    #[test]
    fn set_parses_as_existing_type() {
        let console = console();
        let mut boards = BoardStore::default();
        set(&console, "/SmartDashboard/count", DataValue::Int(1));

        let reply = run(&console, "set /SmartDashboard/count 7", &mut boards).unwrap();
        assert_eq!(reply.text, "/SmartDashboard/count = 7");
        let node = console.registry().select_value(&path("/SmartDashboard/count")).unwrap();
        assert_eq!(node.as_leaf().unwrap().value, DataValue::Int(7));

        assert!(matches!(
            run(&console, "set /SmartDashboard/count seven", &mut boards),
            Err(ConsoleError::Value(_))
        ));
    }

    fn seed_chooser(console: &TestConsole) {
        set(console, "/SmartDashboard/Auto/.controllable", DataValue::Boolean(true));
        set(console, "/SmartDashboard/Auto/.instance", DataValue::Int(0));
        set(console, "/SmartDashboard/Auto/.name", DataValue::String("Auto".to_string()));
        set(console, "/SmartDashboard/Auto/.type", DataValue::String("String Chooser".to_string()));
        set(
            console,
            "/SmartDashboard/Auto/options",
            DataValue::StringArray(vec!["Left".to_string(), "Right".to_string()]),
        );
        set(console, "/SmartDashboard/Auto/default", DataValue::String("Left".to_string()));
        set(console, "/SmartDashboard/Auto/active", DataValue::String("Left".to_string()));
    }

    #[test]
    fn set_on_chooser_writes_selection() {
        let (console, publisher) = recording_console();
        let mut boards = BoardStore::default();
        seed_chooser(&console);
        set(&console, "/SmartDashboard/Auto/selected", DataValue::String("Left".to_string()));

        let reply = run(&console, "set /SmartDashboard/Auto Right", &mut boards).unwrap();
        assert_eq!(reply.text, "/SmartDashboard/Auto/selected = \"Right\"");
        assert_eq!(
            *publisher.writes.lock().unwrap(),
            [(path("/SmartDashboard/Auto/selected"), DataValue::String("Right".to_string()))]
        );
    }

    #[test]
    fn set_on_chooser_without_selection_explains() {
        let (console, publisher) = recording_console();
        let mut boards = BoardStore::default();
        seed_chooser(&console);

        let err = run(&console, "set /SmartDashboard/Auto Right", &mut boards).unwrap_err();
        assert_eq!(err, ConsoleError::NoSelection(path("/SmartDashboard/Auto")));
        assert!(err.to_string().contains("has no selected topic"));
        assert!(publisher.writes.lock().unwrap().is_empty());
    }

    #[test]
    fn classify_against_one_kind() {
        let console = console();
        let mut boards = BoardStore::default();
        seed_chooser(&console);

        assert_eq!(
            parse_command("classify /SmartDashboard/Auto chooser").unwrap(),
            Command::Classify(path("/SmartDashboard/Auto"), Some(CompositeKind::Chooser))
        );
        assert!(matches!(
            parse_command("classify /SmartDashboard/Auto gauge"),
            Err(ConsoleError::Kind(_))
        ));
        assert_eq!(
            parse_command("classify"),
            Err(ConsoleError::Usage(CLASSIFY_USAGE))
        );

        let reply = run(&console, "classify /SmartDashboard/Auto", &mut boards).unwrap();
        assert_eq!(reply.text, "/SmartDashboard/Auto: chooser");
        let reply = run(&console, "classify /SmartDashboard/Auto camera", &mut boards).unwrap();
        assert_eq!(reply.text, "/SmartDashboard/Auto: incomplete branch");
    }

    #[test]
    fn announce_shows_metadata() {
        let console = console();
        let mut boards = BoardStore::default();
        console
            .registry()
            .set_announced_topic(Topic::new(path("/SmartDashboard/speed"), 4, DataType::Double));

        let reply = run(&console, "announce /SmartDashboard/speed", &mut boards).unwrap();
        assert_eq!(reply.text, "/SmartDashboard/speed id=4 type=double");
    }

    #[test]
    fn board_editing() {
        let console = console();
        let mut boards = BoardStore::default();

        let reply = run(&console, "board Teleop", &mut boards).unwrap();
        assert!(reply.boards_changed);
        assert_eq!(boards.current_board, "Teleop");

        run(&console, "add toggle enabled data=/SmartDashboard/enabled", &mut boards).unwrap();
        assert_eq!(boards.current().unwrap().widgets.len(), 1);

        let reply = run(&console, "widgets", &mut boards).unwrap();
        assert_eq!(
            reply.text,
            "enabled [toggle] at (0, 0): waiting (data: missing)"
        );

        assert!(matches!(
            run(&console, "add gauge g", &mut boards),
            Err(ConsoleError::UnknownDisplay { .. })
        ));
        assert!(matches!(
            run(&console, "add toggle t color=/a", &mut boards),
            Err(ConsoleError::UnknownSource { .. })
        ));

        run(&console, "remove enabled", &mut boards).unwrap();
        assert!(boards.current().unwrap().widgets.is_empty());
        assert_eq!(run(&console, "boards", &mut boards).unwrap().text, "* Teleop (0 widgets)");
    }
}
