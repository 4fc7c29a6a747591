//! engine::capabilities
//!
//! Workflow actions and the capability resolver.
//!
//! # Architecture
//!
//! What a session may do to a node is decided by the repository, per node,
//! per workflow category, at the moment of asking. The resolver therefore
//! never caches: each call looks the workflow up and fetches its hints
//! fresh, and the returned [`Resolved`] is used for exactly one action.
//!
//! # Example
//!
//! ```
//! use content_lifecycle::core::config::WorkflowConfig;
//! use content_lifecycle::engine::capabilities::{Action, CapabilityResolver};
//! use content_lifecycle::store::memory::MemoryStore;
//! use content_lifecycle::store::ContentStore;
//!
//! let mut store = MemoryStore::new();
//! let folder = store.seed_folder("/content/documents", None).unwrap();
//!
//! let resolver = CapabilityResolver::new(WorkflowConfig::default());
//! let resolved = resolver.folder_workflow(&mut store, &folder).unwrap();
//! assert!(resolved.require(Action::Add).is_ok());
//! assert!(resolved.require(Action::Publish).is_err());
//! ```

use super::error::StateViolation;
use super::gate::{gate, GateResult};
use crate::core::config::WorkflowConfig;
use crate::core::node::Node;
use crate::store::workflow::{
    hint_keys, DefaultWorkflow, DocumentWorkflow, FolderWorkflow, Hints, TranslationWorkflow,
    WorkflowCategory,
};
use crate::store::{ContentStore, StoreError};

/// A workflow action that must be reported available before it is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Add,
    LocalizeName,
    ObtainEditableInstance,
    DisposeEditableInstance,
    CommitEditableInstance,
    Publish,
    Depublish,
    Delete,
    Copy,
    AddTranslation,
}

impl Action {
    /// Every action.
    pub const ALL: [Action; 10] = [
        Action::Add,
        Action::LocalizeName,
        Action::ObtainEditableInstance,
        Action::DisposeEditableInstance,
        Action::CommitEditableInstance,
        Action::Publish,
        Action::Depublish,
        Action::Delete,
        Action::Copy,
        Action::AddTranslation,
    ];

    /// The hint key reporting this action's availability.
    ///
    /// # Example
    ///
    /// ```
    /// use content_lifecycle::engine::capabilities::Action;
    ///
    /// assert_eq!(Action::ObtainEditableInstance.hint_key(), "obtainEditableInstance");
    /// ```
    pub fn hint_key(&self) -> &'static str {
        match self {
            Action::Add => hint_keys::ADD,
            Action::LocalizeName => hint_keys::LOCALIZE_NAME,
            Action::ObtainEditableInstance => hint_keys::OBTAIN_EDITABLE_INSTANCE,
            Action::DisposeEditableInstance => hint_keys::DISPOSE_EDITABLE_INSTANCE,
            Action::CommitEditableInstance => hint_keys::COMMIT_EDITABLE_INSTANCE,
            Action::Publish => hint_keys::PUBLISH,
            Action::Depublish => hint_keys::DEPUBLISH,
            Action::Delete => hint_keys::DELETE,
            Action::Copy => hint_keys::COPY,
            Action::AddTranslation => hint_keys::ADD_TRANSLATION,
        }
    }

    /// The workflow category offering this action on `node`.
    ///
    /// Only translation depends on the node: folders and documents are
    /// translated by different workflows.
    pub fn category(&self, node: &Node) -> WorkflowCategory {
        match self {
            Action::Add => WorkflowCategory::Folder,
            Action::LocalizeName => WorkflowCategory::Default,
            Action::AddTranslation if node.is_folder() => WorkflowCategory::FolderTranslation,
            Action::AddTranslation => WorkflowCategory::DocumentTranslation,
            _ => WorkflowCategory::Document,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Action::Add => "add a document or folder",
            Action::LocalizeName => "set the display name",
            Action::ObtainEditableInstance => "start editing",
            Action::DisposeEditableInstance => "discard the draft",
            Action::CommitEditableInstance => "commit the draft",
            Action::Publish => "publish",
            Action::Depublish => "take offline",
            Action::Delete => "delete",
            Action::Copy => "copy",
            Action::AddTranslation => "add a translation",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A workflow together with the hints fetched for it.
pub struct Resolved<W: ?Sized> {
    /// The workflow to invoke the action on.
    pub workflow: Box<W>,
    /// Hints fetched when the workflow was resolved.
    pub hints: Hints,
}

impl<W: ?Sized> Resolved<W> {
    /// Gate `action` against the fetched hints.
    pub fn gate(&self, action: Action) -> GateResult {
        gate(&self.hints, action)
    }

    /// Require `action` to be available.
    ///
    /// # Errors
    ///
    /// `StateViolation::ActionUnavailable` unless the hints report the
    /// action as explicitly available.
    pub fn require(&self, action: Action) -> Result<(), StateViolation> {
        match self.gate(action) {
            GateResult::Ready => Ok(()),
            GateResult::Denied { action, .. } => Err(StateViolation::ActionUnavailable(action)),
        }
    }
}

impl<W: ?Sized> std::fmt::Debug for Resolved<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("hints", &self.hints)
            .finish_non_exhaustive()
    }
}

/// Looks up workflows by category and fetches their current hints.
#[derive(Debug, Clone, Default)]
pub struct CapabilityResolver {
    categories: WorkflowConfig,
}

impl CapabilityResolver {
    /// Create a resolver using the given category names.
    pub fn new(categories: WorkflowConfig) -> Self {
        Self { categories }
    }

    /// The configured category names.
    pub fn categories(&self) -> &WorkflowConfig {
        &self.categories
    }

    /// The folder workflow on `folder`.
    pub fn folder_workflow<'s, S: ContentStore + ?Sized>(
        &self,
        store: &'s mut S,
        folder: &Node,
    ) -> Result<Resolved<dyn FolderWorkflow + 's>, StoreError> {
        let category = WorkflowCategory::Folder.name(&self.categories);
        let workflow = store.folder_workflow(category, folder)?;
        let hints = workflow.hints()?;
        Ok(Resolved { workflow, hints })
    }

    /// The default workflow on `node`.
    pub fn default_workflow<'s, S: ContentStore + ?Sized>(
        &self,
        store: &'s mut S,
        node: &Node,
    ) -> Result<Resolved<dyn DefaultWorkflow + 's>, StoreError> {
        let category = WorkflowCategory::Default.name(&self.categories);
        let workflow = store.default_workflow(category, node)?;
        let hints = workflow.hints()?;
        Ok(Resolved { workflow, hints })
    }

    /// The document workflow on `handle`.
    pub fn document_workflow<'s, S: ContentStore + ?Sized>(
        &self,
        store: &'s mut S,
        handle: &Node,
    ) -> Result<Resolved<dyn DocumentWorkflow + 's>, StoreError> {
        let category = WorkflowCategory::Document.name(&self.categories);
        let workflow = store.document_workflow(category, handle)?;
        let hints = workflow.hints()?;
        Ok(Resolved { workflow, hints })
    }

    /// The translation workflow on a folder or a document variant; the
    /// category follows the node kind.
    pub fn translation_workflow<'s, S: ContentStore + ?Sized>(
        &self,
        store: &'s mut S,
        node: &Node,
    ) -> Result<Resolved<dyn TranslationWorkflow + 's>, StoreError> {
        let category = Action::AddTranslation.category(node);
        let workflow = store.translation_workflow(category.name(&self.categories), node)?;
        let hints = workflow.hints()?;
        Ok(Resolved { workflow, hints })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    mod action {
        use super::*;

        #[test]
        fn hint_keys_are_distinct() {
            let mut keys: Vec<&str> = Action::ALL.iter().map(Action::hint_key).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), Action::ALL.len());
        }

        #[test]
        fn categories() {
            let mut store = MemoryStore::new();
            let folder = store.seed_folder("/content", None).unwrap();
            let location = store
                .folder_workflow("threepane", &folder)
                .unwrap()
                .add("new-document", "myapp:article", "news")
                .unwrap();
            let handle = store.node(&location).unwrap();

            assert_eq!(Action::Add.category(&folder), WorkflowCategory::Folder);
            assert_eq!(Action::Publish.category(&handle), WorkflowCategory::Document);
            assert_eq!(Action::LocalizeName.category(&handle), WorkflowCategory::Default);
        }

        #[test]
        fn translation_category_follows_node_kind() {
            let mut store = MemoryStore::new();
            let folder = store.seed_folder("/content", None).unwrap();
            let location = store
                .folder_workflow("threepane", &folder)
                .unwrap()
                .add("new-document", "myapp:article", "news")
                .unwrap();
            let handle = store.node(&location).unwrap();

            assert_eq!(
                Action::AddTranslation.category(&folder),
                WorkflowCategory::FolderTranslation
            );
            assert_eq!(
                Action::AddTranslation.category(&handle),
                WorkflowCategory::DocumentTranslation
            );
        }

        #[test]
        fn display_uses_description() {
            assert_eq!(Action::Depublish.to_string(), "take offline");
        }
    }

    mod resolver {
        use super::*;

        #[test]
        fn hints_are_fetched_per_resolution() {
            let mut store = MemoryStore::new();
            let folder = store.seed_folder("/content", None).unwrap();
            let resolver = CapabilityResolver::default();

            assert!(resolver
                .folder_workflow(&mut store, &folder)
                .unwrap()
                .require(Action::Add)
                .is_ok());

            store.deny("/content", hint_keys::ADD);
            assert_eq!(
                resolver
                    .folder_workflow(&mut store, &folder)
                    .unwrap()
                    .require(Action::Add),
                Err(StateViolation::ActionUnavailable(Action::Add))
            );
        }

        #[test]
        fn custom_categories_are_used() {
            let categories = WorkflowConfig {
                folder: "embedded".to_string(),
                ..WorkflowConfig::default()
            };
            let mut store = MemoryStore::with_categories(categories.clone());
            let folder = store.seed_folder("/content", None).unwrap();

            assert!(CapabilityResolver::default()
                .folder_workflow(&mut store, &folder)
                .is_err());
            assert!(CapabilityResolver::new(categories)
                .folder_workflow(&mut store, &folder)
                .is_ok());
        }

        #[test]
        fn document_workflow_needs_handle() {
            let mut store = MemoryStore::new();
            let folder = store.seed_folder("/content", None).unwrap();
            let err = CapabilityResolver::default()
                .document_workflow(&mut store, &folder)
                .unwrap_err();
            assert!(matches!(err, StoreError::WorkflowUnavailable { .. }));
        }
    }
}
