//! store
//!
//! The content store gateway.
//!
//! # Architecture
//!
//! [`ContentStore`] is the single doorway to the repository. Every node
//! read, node write, session save/rollback and workflow lookup the
//! coordinators perform goes through it; nothing in `engine` or `binding`
//! touches repository state any other way.
//!
//! A store instance is one session bound to one user. Direct node writes
//! accumulate as pending changes until [`save`](ContentStore::save), and
//! [`refresh(false)`](ContentStore::refresh) discards them. Workflow actions
//! are performed by the repository on the session's behalf.
//!
//! # Implementations
//!
//! - [`memory::MemoryStore`]: complete in-memory repository with fault
//!   injection, used by the test suite.

pub mod memory;
pub mod workflow;

use thiserror::Error;

use crate::core::document::VariantMap;
use crate::core::node::Node;
use crate::core::types::{Location, NodeId};
use crate::core::value::PropertyValue;

use workflow::{DefaultWorkflow, DocumentWorkflow, FolderWorkflow, TranslationWorkflow};

/// Errors from store and workflow operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no node at '{0}'")]
    NotFound(String),

    #[error("no node with id {0}")]
    UnknownId(NodeId),

    #[error("'{name}' already exists under '{parent}'")]
    ItemExists { parent: String, name: String },

    #[error("'{0}' is not a document handle")]
    NotAHandle(String),

    #[error("no '{category}' workflow available on '{path}'")]
    WorkflowUnavailable { category: String, path: String },

    #[error("workflow action '{action}' rejected on '{path}': {reason}")]
    WorkflowRejected {
        action: String,
        path: String,
        reason: String,
    },

    #[error("invalid operation on '{path}': {reason}")]
    InvalidOperation { path: String, reason: String },

    #[error("injected failure: {0}")]
    Injected(String),
}

/// Reference to a document variant, handle or folder returned by workflow
/// actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Document {
    id: NodeId,
}

impl Document {
    /// Reference the node with the given id.
    pub fn new(id: NodeId) -> Self {
        Self { id }
    }

    /// The referenced node id.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Load a fresh snapshot of the referenced node.
    pub fn node<S: ContentStore + ?Sized>(&self, store: &S) -> Result<Node, StoreError> {
        store.node_by_id(&self.id)
    }
}

impl From<&Node> for Document {
    fn from(node: &Node) -> Self {
        Self::new(node.id)
    }
}

/// Session-scoped access to a hierarchical content repository.
///
/// The trait is object safe; coordinators hold `S: ContentStore` and the
/// binder works against `&mut dyn ContentStore`.
pub trait ContentStore {
    /// The user this session acts as.
    fn user_id(&self) -> &str;

    // --- reads ---

    /// Whether a node exists at `location`.
    fn node_exists(&self, location: &Location) -> Result<bool, StoreError>;

    /// Snapshot of the node at `location`.
    ///
    /// Variants are same-name children of their handle, so a variant's
    /// location is ambiguous and resolves to the first of them. Use
    /// [`ContentStore::node_by_id`] or [`ContentStore::variants_by_state`]
    /// to reach a particular variant.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when absent.
    fn node(&self, location: &Location) -> Result<Node, StoreError>;

    /// Snapshot of the node with the given id.
    fn node_by_id(&self, id: &NodeId) -> Result<Node, StoreError>;

    /// The parent of `node`, or `None` for the root.
    fn parent(&self, node: &Node) -> Result<Option<Node>, StoreError>;

    /// Children of `node`, in insertion order.
    fn children(&self, node: &Node) -> Result<Vec<Node>, StoreError>;

    /// The first child of `node` named `name`.
    fn child(&self, node: &Node, name: &str) -> Result<Option<Node>, StoreError> {
        Ok(self.children(node)?.into_iter().find(|c| c.name == name))
    }

    // --- pending writes ---

    /// Add a child node; returns its snapshot.
    fn add_node(&mut self, parent: &NodeId, name: &str, primary_type: &str)
        -> Result<Node, StoreError>;

    /// Remove a node and its subtree.
    fn remove_node(&mut self, id: &NodeId) -> Result<(), StoreError>;

    /// Add a mixin type to a node.
    fn add_mixin(&mut self, id: &NodeId, mixin: &str) -> Result<(), StoreError>;

    /// Set (or overwrite) a property.
    fn set_property(&mut self, id: &NodeId, name: &str, value: PropertyValue)
        -> Result<(), StoreError>;

    // --- session ---

    /// Persist pending changes.
    fn save(&mut self) -> Result<(), StoreError>;

    /// Re-read persisted state, keeping or discarding pending changes.
    fn refresh(&mut self, keep_changes: bool) -> Result<(), StoreError>;

    /// Whether the session holds unsaved changes.
    fn has_pending_changes(&self) -> bool;

    // --- workflows ---

    /// The folder workflow registered as `category` on `folder`.
    fn folder_workflow(
        &mut self,
        category: &str,
        folder: &Node,
    ) -> Result<Box<dyn FolderWorkflow + '_>, StoreError>;

    /// The default (naming) workflow registered as `category` on `node`.
    fn default_workflow(
        &mut self,
        category: &str,
        node: &Node,
    ) -> Result<Box<dyn DefaultWorkflow + '_>, StoreError>;

    /// The document workflow registered as `category` on `handle`.
    fn document_workflow(
        &mut self,
        category: &str,
        handle: &Node,
    ) -> Result<Box<dyn DocumentWorkflow + '_>, StoreError>;

    /// The translation workflow registered as `category` on `node`.
    fn translation_workflow(
        &mut self,
        category: &str,
        node: &Node,
    ) -> Result<Box<dyn TranslationWorkflow + '_>, StoreError>;

    // --- provided ---

    /// The handle owning `node`: the node itself when it is a handle, its
    /// parent when that is a handle, otherwise `None`.
    fn resolve_handle(&self, node: &Node) -> Result<Option<Node>, StoreError> {
        if node.is_handle() {
            return Ok(Some(node.clone()));
        }
        match self.parent(node)? {
            Some(parent) if parent.is_handle() => Ok(Some(parent)),
            _ => Ok(None),
        }
    }

    /// The variants of `handle` keyed by state.
    ///
    /// Variants are the children named like the handle that carry a state;
    /// if two share a state, the first one wins.
    fn variants_by_state(&self, handle: &Node) -> Result<VariantMap, StoreError> {
        if !handle.is_handle() {
            return Err(StoreError::NotAHandle(handle.location.to_string()));
        }
        let mut variants = VariantMap::new();
        for child in self.children(handle)? {
            if child.name != handle.name {
                continue;
            }
            if let Some(state) = child.state() {
                variants.entry(state).or_insert(child);
            }
        }
        Ok(variants)
    }
}
