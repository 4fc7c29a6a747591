//! store::workflow
//!
//! Workflow categories, capability hints, and the per-category workflow
//! traits a store exposes.
//!
//! # Hints
//!
//! [`Hints`] is the repository's answer to "what may be done to this node,
//! right now, by this session". It is a value snapshot: it is fetched from a
//! workflow immediately before acting and never cached across actions,
//! because every action changes the answer.
//!
//! # Categories
//!
//! Each [`WorkflowCategory`] maps to one trait exposing only the actions of
//! that category, so callers never downcast a generic workflow object.

use std::collections::BTreeMap;

use super::{Document, StoreError};
use crate::core::config::WorkflowConfig;
use crate::core::types::Location;

/// Hint keys reported by workflows.
pub mod hint_keys {
    pub const ADD: &str = "add";
    pub const LOCALIZE_NAME: &str = "localizeName";
    pub const OBTAIN_EDITABLE_INSTANCE: &str = "obtainEditableInstance";
    pub const DISPOSE_EDITABLE_INSTANCE: &str = "disposeEditableInstance";
    pub const COMMIT_EDITABLE_INSTANCE: &str = "commitEditableInstance";
    pub const PUBLISH: &str = "publish";
    pub const DEPUBLISH: &str = "depublish";
    pub const DELETE: &str = "delete";
    pub const COPY: &str = "copy";
    pub const ADD_TRANSLATION: &str = "addTranslation";
    /// Whether the document is currently available on the live site.
    pub const IS_LIVE: &str = "isLive";
    /// Who holds the open draft.
    pub const IN_USE_BY: &str = "inUseBy";
}

/// A named grouping of related lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowCategory {
    /// Adding documents and subfolders.
    Folder,
    /// Editing, publication and removal of documents.
    Document,
    /// Naming.
    Default,
    /// Translating folders.
    FolderTranslation,
    /// Translating documents.
    DocumentTranslation,
}

impl WorkflowCategory {
    /// The category name registered in the repository, per configuration.
    pub fn name<'c>(&self, config: &'c WorkflowConfig) -> &'c str {
        match self {
            WorkflowCategory::Folder => &config.folder,
            WorkflowCategory::Document => &config.document,
            WorkflowCategory::Default => &config.default,
            WorkflowCategory::FolderTranslation => &config.folder_translation,
            WorkflowCategory::DocumentTranslation => &config.document_translation,
        }
    }
}

impl std::fmt::Display for WorkflowCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WorkflowCategory::Folder => "folder",
            WorkflowCategory::Document => "document",
            WorkflowCategory::Default => "default",
            WorkflowCategory::FolderTranslation => "folder-translation",
            WorkflowCategory::DocumentTranslation => "document-translation",
        };
        write!(f, "{label}")
    }
}

/// A single hint value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintValue {
    /// Action availability or a boolean status.
    Flag(bool),
    /// Informational text (e.g. the draft holder).
    Text(String),
}

/// The capability map of one node for one workflow category.
///
/// # Example
///
/// ```
/// use content_lifecycle::store::workflow::Hints;
///
/// let hints = Hints::new()
///     .with_flag("publish", true)
///     .with_flag("isLive", false);
///
/// assert!(hints.is_true("publish"));
/// assert!(hints.is_false("isLive"));
///
/// // A missing key is neither true nor false.
/// assert!(!hints.is_true("delete"));
/// assert!(!hints.is_false("delete"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hints {
    entries: BTreeMap<String, HintValue>,
}

impl Hints {
    /// Create an empty hint map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert) for flags.
    pub fn with_flag(mut self, key: &str, value: bool) -> Self {
        self.insert(key, HintValue::Flag(value));
        self
    }

    /// Builder form of [`insert`](Self::insert) for text.
    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, HintValue::Text(value.into()));
        self
    }

    /// Insert or replace a hint.
    pub fn insert(&mut self, key: &str, value: HintValue) {
        self.entries.insert(key.to_string(), value);
    }

    /// Get a hint.
    pub fn get(&self, key: &str) -> Option<&HintValue> {
        self.entries.get(key)
    }

    /// True only for an explicit `Flag(true)`.
    pub fn is_true(&self, key: &str) -> bool {
        matches!(self.get(key), Some(HintValue::Flag(true)))
    }

    /// True only for an explicit `Flag(false)`.
    pub fn is_false(&self, key: &str) -> bool {
        matches!(self.get(key), Some(HintValue::Flag(false)))
    }

    /// Text hint value.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(HintValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Number of hints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no hints.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over hints in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HintValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Workflow on a folder.
pub trait FolderWorkflow {
    /// Current hints for the folder.
    fn hints(&self) -> Result<Hints, StoreError>;

    /// Add a document or subfolder; `category` selects which.
    ///
    /// Returns the location of the new node (the handle, for documents).
    fn add(&mut self, category: &str, primary_type: &str, name: &str)
        -> Result<Location, StoreError>;
}

/// Naming workflow on a handle or folder.
pub trait DefaultWorkflow {
    /// Current hints for the node.
    fn hints(&self) -> Result<Hints, StoreError>;

    /// Set the display name, tagging the content with `locale` when non-blank.
    fn localize_name(&mut self, locale: &str, name: &str) -> Result<(), StoreError>;
}

/// Workflow on a document handle.
pub trait DocumentWorkflow {
    /// Current hints for the document.
    fn hints(&self) -> Result<Hints, StoreError>;

    /// Open the draft for exclusive editing; returns the draft variant.
    fn obtain_editable_instance(&mut self) -> Result<Document, StoreError>;

    /// Discard the draft; returns the variant editing fell back to.
    fn dispose_editable_instance(&mut self) -> Result<Document, StoreError>;

    /// Persist the draft into the unpublished variant; returns it.
    fn commit_editable_instance(&mut self) -> Result<Document, StoreError>;

    /// Make the unpublished content live.
    fn publish(&mut self) -> Result<(), StoreError>;

    /// Take the live content offline.
    fn depublish(&mut self) -> Result<(), StoreError>;

    /// Remove the handle and all its variants.
    fn delete(&mut self) -> Result<(), StoreError>;

    /// Copy the document into `target_folder` as `name`.
    fn copy(&mut self, target_folder: &Document, name: &str) -> Result<(), StoreError>;
}

/// Translation workflow on a folder or document variant.
pub trait TranslationWorkflow {
    /// Current hints for the node.
    fn hints(&self) -> Result<Hints, StoreError>;

    /// Create the `language` translation named `name`; returns the new
    /// folder, or the new document variant.
    fn add_translation(&mut self, language: &str, name: &str) -> Result<Document, StoreError>;
}
