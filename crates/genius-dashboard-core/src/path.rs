//! Canonical topic paths.
//!
//! A topic path is an ordered, non-empty sequence of non-empty segments,
//! written canonically as `/seg1/seg2/...`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// A validated topic path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopicPath {
    segments: Vec<String>,
}

impl TopicPath {
    /// Parse a canonical path such as `/SmartDashboard/g`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if the input is empty, does not start with `/`,
    /// or contains an empty segment.
    pub fn parse(canonical: &str) -> Result<Self, PathError> {
        if canonical.is_empty() {
            return Err(PathError::Empty);
        }

        let Some(stripped) = canonical.strip_prefix(SEPARATOR) else {
            return Err(PathError::MissingLeadingSeparator(canonical.to_string()));
        };

        if stripped.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<String> = stripped.split(SEPARATOR).map(str::to_string).collect();
        if let Some(index) = segments.iter().position(String::is_empty) {
            return Err(PathError::EmptySegment {
                path: canonical.to_string(),
                index,
            });
        }

        Ok(Self { segments })
    }

    /// Build a path from already split segments.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if there are no segments, or if a segment is
    /// empty or contains the separator.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Path extended by one segment.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidSegment`] if the segment is empty or
    /// contains the separator.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    /// The ordered segments of this path.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.segments.len() < other.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// Canonical string form.
    #[must_use]
    pub fn join(&self) -> String {
        join(&self.segments)
    }
}

/// Join segments into the canonical `/a/b/c` form.
#[must_use]
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push(SEPARATOR);
        out.push_str(segment.as_ref());
    }
    out
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() || segment.contains(SEPARATOR) {
        return Err(PathError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{SEPARATOR}{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for TopicPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TopicPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TopicPath> for String {
    fn from(path: TopicPath) -> Self {
        path.join()
    }
}

/// Errors for malformed topic paths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path has no segments
    #[error("topic path is empty")]
    Empty,
    /// The path does not start with `/`
    #[error("topic path must start with '/': {0}")]
    MissingLeadingSeparator(String),
    /// Two separators in a row, or a trailing separator
    #[error("empty segment at index {index} in topic path {path}")]
    EmptySegment {
        /// The offending path
        path: String,
        /// Zero-based index of the empty segment
        index: usize,
    },
    /// A single segment is empty or contains the separator
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),
}
