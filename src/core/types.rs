//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Location`] - Validated absolute path of a node in the content tree
//! - [`NodeId`] - Stable node identifier
//! - [`VariantState`] - Lifecycle state of a document variant
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a coordinator holding a `Location` never has
//! to re-check for blank or relative paths.
//!
//! # Examples
//!
//! ```
//! use content_lifecycle::core::types::{Location, VariantState};
//!
//! let location = Location::new("/content/documents/news").unwrap();
//! assert_eq!(location.name(), Some("news"));
//! assert_eq!(location.parent().unwrap().as_str(), "/content/documents");
//!
//! assert!(Location::new("").is_err());
//! assert!(Location::new("content/documents").is_err());
//!
//! assert_eq!("published".parse::<VariantState>().unwrap(), VariantState::Published);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid node id: {0}")]
    InvalidNodeId(String),

    #[error("invalid variant state: {0}")]
    InvalidVariantState(String),
}

/// A validated absolute location in the content tree.
///
/// Locations must:
/// - Not be blank
/// - Start with `/`
/// - Not end with `/` (except the root location `/` itself)
/// - Not contain empty, `.` or `..` segments
/// - Not contain `[`, `]`, `*`, `|` or ASCII control characters
///
/// A location is not unique across locale variants: several variant nodes
/// share the path of their handle, which is why lookups resolve a location
/// to a handle before acting on it.
///
/// # Example
///
/// ```
/// use content_lifecycle::core::types::Location;
///
/// let loc = Location::new("/content/documents/news/article").unwrap();
/// let segments: Vec<_> = loc.segments().collect();
/// assert_eq!(segments, vec!["content", "documents", "news", "article"]);
///
/// assert!(Location::new("/").unwrap().is_root());
/// assert!(Location::new("/content//documents").is_err());
/// assert!(Location::new("/content/").is_err());
/// assert!(Location::new("/content/*").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

impl Location {
    /// Create a new validated location.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLocation` if the path violates the rules above.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    /// The root location `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if path.trim().is_empty() {
            return Err(TypeError::InvalidLocation(
                "location cannot be blank".into(),
            ));
        }

        if !path.starts_with('/') {
            return Err(TypeError::InvalidLocation(format!(
                "location '{path}' must be absolute"
            )));
        }

        if path == "/" {
            return Ok(());
        }

        if path.ends_with('/') {
            return Err(TypeError::InvalidLocation(format!(
                "location '{path}' cannot end with '/'"
            )));
        }

        for segment in path[1..].split('/') {
            Self::validate_segment(segment)
                .map_err(|reason| TypeError::InvalidLocation(format!("'{path}': {reason}")))?;
        }

        Ok(())
    }

    /// Validate a single path segment (a node name).
    fn validate_segment(segment: &str) -> Result<(), String> {
        if segment.is_empty() {
            return Err("empty path segment".into());
        }
        if segment == "." || segment == ".." {
            return Err(format!("relative segment '{segment}'"));
        }

        const INVALID_CHARS: [char; 4] = ['[', ']', '*', '|'];
        for c in INVALID_CHARS {
            if segment.contains(c) {
                return Err(format!("segment '{segment}' cannot contain '{c}'"));
            }
        }

        if segment.chars().any(|c| c.is_ascii_control()) {
            return Err("segment cannot contain control characters".into());
        }

        Ok(())
    }

    /// Check whether `name` is usable as a single node name.
    ///
    /// # Example
    ///
    /// ```
    /// use content_lifecycle::core::types::Location;
    ///
    /// assert!(Location::is_valid_name("article"));
    /// assert!(!Location::is_valid_name("a/b"));
    /// assert!(!Location::is_valid_name(""));
    /// ```
    pub fn is_valid_name(name: &str) -> bool {
        !name.contains('/') && Self::validate_segment(name).is_ok()
    }

    /// Get the location as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the root location.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Iterate over the path segments (node names), root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// The last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// The parent location, or `None` for the root.
    pub fn parent(&self) -> Option<Location> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Location::root()),
            Some(idx) => Some(Location(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Append a child node name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLocation` if `name` is not a valid single segment.
    pub fn join(&self, name: &str) -> Result<Location, TypeError> {
        if !Self::is_valid_name(name) {
            return Err(TypeError::InvalidLocation(format!(
                "'{name}' is not a valid node name"
            )));
        }
        if self.is_root() {
            Ok(Location(format!("/{name}")))
        } else {
            Ok(Location(format!("{}/{name}", self.0)))
        }
    }

    /// Every non-root location from the first segment down to this one.
    ///
    /// # Example
    ///
    /// ```
    /// use content_lifecycle::core::types::Location;
    ///
    /// let loc = Location::new("/content/documents/news").unwrap();
    /// let chain: Vec<String> = loc.ancestry().iter().map(|l| l.to_string()).collect();
    /// assert_eq!(chain, vec!["/content", "/content/documents", "/content/documents/news"]);
    /// ```
    pub fn ancestry(&self) -> Vec<Location> {
        let mut chain = Vec::new();
        let mut current = String::new();
        for segment in self.segments() {
            current.push('/');
            current.push_str(segment);
            chain.push(Location(current.clone()));
        }
        chain
    }
}

impl TryFrom<String> for Location {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl FromStr for Location {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}

impl AsRef<str> for Location {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a repository node.
///
/// Identifiers survive moves and renames, unlike locations. Variant handles
/// returned by the coordinators carry a `NodeId` rather than a path because
/// several variants share one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its hyphenated text form.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidNodeId` if the text is not a UUID.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(text)
            .map(Self)
            .map_err(|e| TypeError::InvalidNodeId(format!("'{text}': {e}")))
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a document variant.
///
/// Stored on variant nodes in the `hippostd:state` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantState {
    /// The editable working copy, held by at most one actor.
    Draft,
    /// The latest committed revision.
    Unpublished,
    /// The revision exposed to the live site (when available as live).
    Published,
}

impl VariantState {
    /// All states, in lifecycle order.
    pub const ALL: [VariantState; 3] = [
        VariantState::Draft,
        VariantState::Unpublished,
        VariantState::Published,
    ];

    /// The value stored in the state property.
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantState::Draft => "draft",
            VariantState::Unpublished => "unpublished",
            VariantState::Published => "published",
        }
    }
}

impl FromStr for VariantState {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(VariantState::Draft),
            "unpublished" => Ok(VariantState::Unpublished),
            "published" => Ok(VariantState::Published),
            other => Err(TypeError::InvalidVariantState(other.to_string())),
        }
    }
}

impl std::fmt::Display for VariantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod location {
        use super::*;

        #[test]
        fn valid_locations() {
            assert!(Location::new("/").is_ok());
            assert!(Location::new("/content").is_ok());
            assert!(Location::new("/content/documents/news").is_ok());
            assert!(Location::new("/content/gallery/my image.png").is_ok());
            assert!(Location::new("/content/documents/hippo:name").is_ok());
        }

        #[test]
        fn blank_rejected() {
            assert!(Location::new("").is_err());
            assert!(Location::new("   ").is_err());
        }

        #[test]
        fn relative_rejected() {
            assert!(Location::new("content").is_err());
            assert!(Location::new("content/documents").is_err());
        }

        #[test]
        fn trailing_slash_rejected() {
            assert!(Location::new("/content/").is_err());
        }

        #[test]
        fn empty_segment_rejected() {
            assert!(Location::new("//content").is_err());
            assert!(Location::new("/content//news").is_err());
        }

        #[test]
        fn dot_segments_rejected() {
            assert!(Location::new("/content/.").is_err());
            assert!(Location::new("/content/../etc").is_err());
        }

        #[test]
        fn special_chars_rejected() {
            assert!(Location::new("/content/a[1]").is_err());
            assert!(Location::new("/content/*").is_err());
            assert!(Location::new("/content/a|b").is_err());
            assert!(Location::new("/content/a\tb").is_err());
        }

        #[test]
        fn error_message_names_location() {
            let err = Location::new("/content//news").unwrap_err();
            assert!(err.to_string().contains("/content//news"));
        }

        #[test]
        fn name_and_parent() {
            let loc = Location::new("/content/documents").unwrap();
            assert_eq!(loc.name(), Some("documents"));
            assert_eq!(loc.parent(), Some(Location::new("/content").unwrap()));

            let top = Location::new("/content").unwrap();
            assert_eq!(top.parent(), Some(Location::root()));

            assert_eq!(Location::root().name(), None);
            assert_eq!(Location::root().parent(), None);
        }

        #[test]
        fn join_appends_segment() {
            let loc = Location::new("/content").unwrap();
            assert_eq!(loc.join("news").unwrap().as_str(), "/content/news");
            assert_eq!(Location::root().join("content").unwrap().as_str(), "/content");
        }

        #[test]
        fn join_rejects_paths() {
            let loc = Location::new("/content").unwrap();
            assert!(loc.join("a/b").is_err());
            assert!(loc.join("").is_err());
            assert!(loc.join("..").is_err());
        }

        #[test]
        fn ancestry_of_root_is_empty() {
            assert!(Location::root().ancestry().is_empty());
        }

        #[test]
        fn serde_roundtrip() {
            let loc = Location::new("/content/documents").unwrap();
            let json = serde_json::to_string(&loc).unwrap();
            assert_eq!(json, "\"/content/documents\"");
            let parsed: Location = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, loc);
        }

        #[test]
        fn serde_rejects_invalid() {
            let result: Result<Location, _> = serde_json::from_str("\"relative/path\"");
            assert!(result.is_err());
        }
    }

    mod node_id {
        use super::*;

        #[test]
        fn new_ids_are_unique() {
            assert_ne!(NodeId::new(), NodeId::new());
        }

        #[test]
        fn parse_roundtrip() {
            let id = NodeId::new();
            let parsed = NodeId::parse(&id.to_string()).unwrap();
            assert_eq!(id, parsed);
        }

        #[test]
        fn parse_rejects_garbage() {
            assert!(matches!(
                NodeId::parse("not-a-uuid"),
                Err(TypeError::InvalidNodeId(_))
            ));
        }
    }

    mod variant_state {
        use super::*;

        #[test]
        fn parse_all_states() {
            for state in VariantState::ALL {
                assert_eq!(state.as_str().parse::<VariantState>().unwrap(), state);
            }
        }

        #[test]
        fn parse_unknown_state() {
            assert!("archived".parse::<VariantState>().is_err());
        }

        #[test]
        fn display_matches_stored_value() {
            assert_eq!(VariantState::Unpublished.to_string(), "unpublished");
        }
    }
}
