//! MQTT topic scheme for the robot bridge.
//!
//! Topic structure: `genius-dashboard/v1/{team}/{kind}/{encoded topic path}`
//!
//! Each segment of the topic path becomes one MQTT topic level. Segments are
//! percent-encoded so that characters MQTT reserves never change the
//! topic's structure.

use genius_dashboard_core::TopicPath;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

/// Protocol version for topic scheme.
pub const PROTOCOL_VERSION: &str = "v1";

/// Default topic prefix.
pub const DEFAULT_PREFIX: &str = "genius-dashboard";

/// Characters escaped inside a topic level.
const SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'#').add(b'+').add(b'/').add(b'%');

/// Topic scheme configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicScheme {
    /// Team number of the robot
    pub team: u32,
    /// Topic prefix (default: "genius-dashboard")
    pub prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TopicScheme {
    /// Create a new topic scheme for the given team.
    #[must_use]
    pub fn new(team: u32) -> Self {
        Self {
            team,
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Use a different prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn base(&self) -> String {
        format!("{}/{}/{}", self.prefix, PROTOCOL_VERSION, self.team)
    }

    /// Topic for frames of `kind` about `path`.
    #[must_use]
    pub fn topic(&self, kind: FrameKind, path: &TopicPath) -> String {
        format!("{}/{}/{}", self.base(), kind.as_str(), encode_path(path))
    }

    /// Topic carrying value updates from the robot.
    #[must_use]
    pub fn value(&self, path: &TopicPath) -> String {
        self.topic(FrameKind::Value, path)
    }

    /// Topic carrying announcements from the robot.
    #[must_use]
    pub fn announce(&self, path: &TopicPath) -> String {
        self.topic(FrameKind::Announce, path)
    }

    /// Topic the dashboard writes values to.
    #[must_use]
    pub fn publish(&self, path: &TopicPath) -> String {
        self.topic(FrameKind::Publish, path)
    }

    /// Wildcard subscription for every topic of one frame kind.
    #[must_use]
    pub fn wildcard(&self, kind: FrameKind) -> String {
        format!("{}/{}/#", self.base(), kind.as_str())
    }

    /// Wildcard subscription for everything of this team.
    #[must_use]
    pub fn team_wildcard(&self) -> String {
        format!("{}/#", self.base())
    }

    /// Parse a topic to extract components.
    ///
    /// Returns `(path, kind)` if the topic belongs to this scheme.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<(TopicPath, FrameKind)> {
        let remainder = topic.strip_prefix(&self.base())?.strip_prefix('/')?;
        let (kind, encoded) = remainder.split_once('/')?;
        let kind = FrameKind::from_level(kind)?;
        let path = decode_path(encoded)?;
        Some((path, kind))
    }
}

/// Percent-encode each segment of `path` and join them with `/`.
#[must_use]
pub fn encode_path(path: &TopicPath) -> String {
    path.segments()
        .iter()
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`encode_path`].
#[must_use]
pub fn decode_path(encoded: &str) -> Option<TopicPath> {
    let segments = encoded
        .split('/')
        .map(|level| {
            percent_decode_str(level)
                .decode_utf8()
                .ok()
                .map(|segment| segment.into_owned())
        })
        .collect::<Option<Vec<String>>>()?;
    TopicPath::from_segments(segments).ok()
}

/// Frame kinds in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Value update from the robot
    Value,
    /// Topic announcement from the robot
    Announce,
    /// Value written by the dashboard
    Publish,
}

impl FrameKind {
    /// Topic level naming the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Value => "value",
            FrameKind::Announce => "announce",
            FrameKind::Publish => "publish",
        }
    }

    fn from_level(level: &str) -> Option<Self> {
        match level {
            "value" => Some(FrameKind::Value),
            "announce" => Some(FrameKind::Announce),
            "publish" => Some(FrameKind::Publish),
            _ => None,
        }
    }
}
