//! binding::filter
//!
//! Exclusion filters deciding which record items a binder may write.
//!
//! # Patterns
//!
//! - `hippo:availability` excludes exactly that name.
//! - `hippostd:*` excludes every name starting with `hippostd:` (the whole
//!   namespace). Any trailing `*` is a prefix match.
//!
//! Exclusions always win: a property named by an exclude pattern is never
//! written, whatever value the record carries for it.
//!
//! # Example
//!
//! ```
//! use content_lifecycle::binding::filter::BindingFilter;
//!
//! let filter = BindingFilter::document_default();
//! assert!(!filter.accepts_property("hippostd:state"));
//! assert!(filter.accepts_property("myapp:title"));
//! ```

use thiserror::Error;

use super::record::{META_NODE_LOCALIZED_NAME, META_NODE_NAME, META_NODE_PATH};

/// Errors from parsing exclude patterns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("exclude pattern cannot be blank")]
    Blank,

    #[error("exclude pattern '{0}' may only use '*' as its last character")]
    MisplacedWildcard(String),

    #[error("exclude pattern '{0}' needs a prefix before '*'")]
    EmptyPrefix(String),
}

/// One exclusion predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludePattern {
    /// Matches one name verbatim.
    Exact(String),
    /// Matches every name starting with the prefix.
    Prefix(String),
}

impl ExcludePattern {
    /// Parse a pattern.
    ///
    /// # Errors
    ///
    /// Returns `PatternError` for blank patterns, a `*` that is not the last
    /// character, or a bare `*`.
    ///
    /// # Example
    ///
    /// ```
    /// use content_lifecycle::binding::filter::ExcludePattern;
    ///
    /// assert_eq!(
    ///     ExcludePattern::parse("hippo:*").unwrap(),
    ///     ExcludePattern::Prefix("hippo:".to_string())
    /// );
    /// assert!(ExcludePattern::parse("*").is_err());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(PatternError::Blank);
        }

        match pattern.find('*') {
            None => Ok(ExcludePattern::Exact(pattern.to_string())),
            Some(idx) if idx != pattern.len() - 1 => {
                Err(PatternError::MisplacedWildcard(pattern.to_string()))
            }
            Some(0) => Err(PatternError::EmptyPrefix(pattern.to_string())),
            Some(idx) => Ok(ExcludePattern::Prefix(pattern[..idx].to_string())),
        }
    }

    /// Whether `name` is excluded by this pattern.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ExcludePattern::Exact(exact) => name == exact,
            ExcludePattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

impl std::fmt::Display for ExcludePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExcludePattern::Exact(exact) => write!(f, "{exact}"),
            ExcludePattern::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Ordered exclusion lists for properties and child nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingFilter {
    property_excludes: Vec<ExcludePattern>,
    node_excludes: Vec<ExcludePattern>,
}

impl BindingFilter {
    /// A filter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from textual patterns.
    pub fn from_patterns<P, N>(properties: P, nodes: N) -> Result<Self, PatternError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        let mut filter = Self::new();
        for pattern in properties {
            filter.exclude_property(pattern.as_ref())?;
        }
        for pattern in nodes {
            filter.exclude_node(pattern.as_ref())?;
        }
        Ok(filter)
    }

    /// The filter for document binding: all repository-owned namespaces.
    pub fn document_default() -> Self {
        Self {
            property_excludes: vec![
                ExcludePattern::Prefix("hippo:".to_string()),
                ExcludePattern::Prefix("hippostd:".to_string()),
                ExcludePattern::Prefix("hippostdpubwf:".to_string()),
            ],
            node_excludes: Vec::new(),
        }
    }

    /// The filter for binary binding: record metadata plus the
    /// repository-owned state and publication properties.
    pub fn binary_default() -> Self {
        let exact = |name: &str| ExcludePattern::Exact(name.to_string());
        Self {
            property_excludes: vec![
                exact(META_NODE_NAME),
                exact(META_NODE_LOCALIZED_NAME),
                exact(META_NODE_PATH),
                ExcludePattern::Prefix("hippostdpubwf:".to_string()),
                exact("hippo:availability"),
                exact("hippo:paths"),
                exact("hippo:related"),
                exact("hippostd:holder"),
                exact("hippostd:state"),
                exact("hippostd:stateSummary"),
            ],
            node_excludes: Vec::new(),
        }
    }

    /// Append a property exclusion.
    pub fn exclude_property(&mut self, pattern: &str) -> Result<&mut Self, PatternError> {
        self.property_excludes.push(ExcludePattern::parse(pattern)?);
        Ok(self)
    }

    /// Append a child node exclusion.
    pub fn exclude_node(&mut self, pattern: &str) -> Result<&mut Self, PatternError> {
        self.node_excludes.push(ExcludePattern::parse(pattern)?);
        Ok(self)
    }

    /// The first pattern excluding property `name`.
    pub fn property_excluded_by(&self, name: &str) -> Option<&ExcludePattern> {
        self.property_excludes.iter().find(|p| p.matches(name))
    }

    /// Whether property `name` may be written.
    pub fn accepts_property(&self, name: &str) -> bool {
        self.property_excluded_by(name).is_none()
    }

    /// Whether child node `name` may be written.
    pub fn accepts_node(&self, name: &str) -> bool {
        !self.node_excludes.iter().any(|p| p.matches(name))
    }

    /// Property exclusions in order.
    pub fn property_excludes(&self) -> &[ExcludePattern] {
        &self.property_excludes
    }

    /// Node exclusions in order.
    pub fn node_excludes(&self) -> &[ExcludePattern] {
        &self.node_excludes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{BinaryConfig, BindingConfig};

    mod pattern {
        use super::*;

        #[test]
        fn exact_parse() {
            assert_eq!(
                ExcludePattern::parse("hippo:paths").unwrap(),
                ExcludePattern::Exact("hippo:paths".to_string())
            );
        }

        #[test]
        fn trims_whitespace() {
            assert_eq!(
                ExcludePattern::parse("  hippo:* ").unwrap(),
                ExcludePattern::Prefix("hippo:".to_string())
            );
        }

        #[test]
        fn rejects_malformed() {
            assert_eq!(ExcludePattern::parse(""), Err(PatternError::Blank));
            assert!(matches!(
                ExcludePattern::parse("hip*po:"),
                Err(PatternError::MisplacedWildcard(_))
            ));
            assert!(matches!(
                ExcludePattern::parse("*"),
                Err(PatternError::EmptyPrefix(_))
            ));
        }

        #[test]
        fn namespace_prefix_is_exact_about_colon() {
            let pattern = ExcludePattern::parse("hippo:*").unwrap();
            assert!(pattern.matches("hippo:availability"));
            assert!(!pattern.matches("hippostd:state"));
            assert!(!pattern.matches("hippo"));
        }

        #[test]
        fn display_restores_text() {
            for text in ["hippo:*", "hippo:paths"] {
                assert_eq!(ExcludePattern::parse(text).unwrap().to_string(), text);
            }
        }
    }

    mod filter {
        use super::*;

        #[test]
        fn empty_filter_accepts_all() {
            let filter = BindingFilter::new();
            assert!(filter.accepts_property("hippostd:state"));
            assert!(filter.accepts_node("anything"));
        }

        #[test]
        fn document_default_excludes_namespaces() {
            let filter = BindingFilter::document_default();
            assert!(!filter.accepts_property("hippo:availability"));
            assert!(!filter.accepts_property("hippostd:state"));
            assert!(!filter.accepts_property("hippostdpubwf:createdBy"));
            assert!(filter.accepts_property("myapp:title"));
            assert!(filter.accepts_property("jcr:name"));
        }

        #[test]
        fn binary_default_excludes_metadata_and_state() {
            let filter = BindingFilter::binary_default();
            assert!(!filter.accepts_property(META_NODE_NAME));
            assert!(!filter.accepts_property(META_NODE_PATH));
            assert!(!filter.accepts_property("hippostd:state"));
            assert!(!filter.accepts_property("hippostdpubwf:publicationDate"));
            // Only specific hippostd properties are excluded for binaries.
            assert!(filter.accepts_property("hippostd:foldertype"));
            assert!(filter.accepts_property("jcr:data"));
        }

        #[test]
        fn defaults_match_config_defaults() {
            let binding = BindingConfig::default();
            let from_config =
                BindingFilter::from_patterns(&binding.property_excludes, &binding.node_excludes)
                    .unwrap();
            assert_eq!(from_config, BindingFilter::document_default());

            let binary = BinaryConfig::default();
            let from_config =
                BindingFilter::from_patterns(&binary.property_excludes, &binary.node_excludes)
                    .unwrap();
            assert_eq!(from_config, BindingFilter::binary_default());
        }

        #[test]
        fn first_matching_pattern_reported() {
            let filter =
                BindingFilter::from_patterns(["myapp:secret", "myapp:*"], Vec::<String>::new())
                    .unwrap();
            assert_eq!(
                filter.property_excluded_by("myapp:secret"),
                Some(&ExcludePattern::Exact("myapp:secret".to_string()))
            );
            assert_eq!(
                filter.property_excluded_by("myapp:other"),
                Some(&ExcludePattern::Prefix("myapp:".to_string()))
            );
        }

        #[test]
        fn node_excludes() {
            let mut filter = BindingFilter::new();
            filter.exclude_node("hippo:translation").unwrap();
            assert!(!filter.accepts_node("hippo:translation"));
            assert!(filter.accepts_node("myapp:body"));
        }
    }
}
