//! engine::manager
//!
//! The document lifecycle coordinator.
//!
//! # Protocol
//!
//! Every operation follows the same three steps:
//!
//! 1. **Resolve** the location to a node (and, for documents, its handle).
//!    Bad input is reported as `InvalidArgument` before any workflow is
//!    touched.
//! 2. **Gate** the action against hints fetched from the workflow at this
//!    moment. An unavailable action is reported as `IllegalState`.
//! 3. **Invoke** the action. Anything the store or workflow raises is
//!    wrapped into `Failure`, and pending session changes are discarded.
//!
//! Hints are never reused across actions: the repository recomputes them
//! from the document's state, locks and permissions, and a stale answer is
//! a time-of-check/time-of-use hazard.
//!
//! # Folder creation
//!
//! `create_document` and `copy_document` create missing folders on the way
//! to their target through the parent folder's workflow. Those actions
//! persist immediately, so if the operation fails afterwards the topmost
//! node it created is removed again.
//!
//! # Example
//!
//! ```
//! use content_lifecycle::binding::{ContentNode, ContentProperty};
//! use content_lifecycle::engine::DocumentManager;
//! use content_lifecycle::store::memory::MemoryStore;
//!
//! let mut store = MemoryStore::new();
//! store.seed_folder("/content/documents", None).unwrap();
//!
//! let mut manager = DocumentManager::new(store);
//! let location = manager
//!     .create_document("/content/documents/news", "myapp:article", "hello", "en", "Hello")
//!     .unwrap();
//!
//! let draft = manager.obtain_editable_document(location.as_str()).unwrap();
//! let record = ContentNode::new("hello", "myapp:article")
//!     .with_property(ContentProperty::string("myapp:title", "Hello world"));
//! manager.update_editable_document(&draft, &record).unwrap();
//! manager.commit_editable_document(location.as_str()).unwrap();
//! assert!(manager.publish_document(location.as_str()).unwrap());
//! ```

use tracing::{debug, error};

use super::binary::BinaryImporter;
use super::capabilities::{Action, CapabilityResolver, Resolved};
use super::error::{ErrorContext, ErrorKind, ManagerError, Operation, StateViolation};
use super::rollback::{discard_pending, undo_created};
use crate::binding::{
    BindingFilter, ContentNode, DefaultFieldBinder, DefaultValueConverter, FieldBinder,
    ValueConverter,
};
use crate::core::config::{ConfigError, ManagerConfig};
use crate::core::document::translation_source;
use crate::core::node::Node;
use crate::core::types::{Location, VariantState};
use crate::store::workflow::{hint_keys, DocumentWorkflow};
use crate::store::{ContentStore, Document, StoreError};

/// A folder guaranteed to exist, and the topmost node created to get there.
struct EnsuredFolder {
    folder: Node,
    created: Option<Node>,
}

/// Coordinates workflow-gated lifecycle operations on one store session.
///
/// The manager owns its session. It is a single logical actor: operations
/// take `&mut self` and run to completion before returning.
pub struct DocumentManager<S: ContentStore> {
    pub(super) store: S,
    pub(super) config: ManagerConfig,
    resolver: CapabilityResolver,
    pub(super) binder: Box<dyn FieldBinder>,
    pub(super) converter: Box<dyn ValueConverter>,
    filter: BindingFilter,
    pub(super) binary_filter: BindingFilter,
}

impl<S: ContentStore> DocumentManager<S> {
    /// Create a manager with the default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: ManagerConfig::default(),
            resolver: CapabilityResolver::default(),
            binder: Box::new(DefaultFieldBinder),
            converter: Box::new(DefaultValueConverter),
            filter: BindingFilter::document_default(),
            binary_filter: BindingFilter::binary_default(),
        }
    }

    /// Create a manager using `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the configuration does not
    /// validate.
    pub fn with_config(store: S, config: ManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let invalid = |e: crate::binding::PatternError| ConfigError::InvalidValue(e.to_string());
        let filter = BindingFilter::from_patterns(
            &config.binding.property_excludes,
            &config.binding.node_excludes,
        )
        .map_err(invalid)?;
        let binary_filter = BindingFilter::from_patterns(
            &config.binary.property_excludes,
            &config.binary.node_excludes,
        )
        .map_err(invalid)?;

        Ok(Self {
            store,
            resolver: CapabilityResolver::new(config.workflow.clone()),
            config,
            binder: Box::new(DefaultFieldBinder),
            converter: Box::new(DefaultValueConverter),
            filter,
            binary_filter,
        })
    }

    /// Replace the field binder.
    pub fn with_binder(mut self, binder: impl FieldBinder + 'static) -> Self {
        self.binder = Box::new(binder);
        self
    }

    /// Replace the value converter used when binding.
    pub fn with_converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Replace the filter applied when binding document content.
    pub fn with_filter(mut self, filter: BindingFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The underlying session.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying session.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the manager, returning the session.
    pub fn into_store(self) -> S {
        self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The filter applied when binding document content.
    pub fn filter(&self) -> &BindingFilter {
        &self.filter
    }

    /// A binary importer sharing this manager's session and binder.
    pub fn binary_importer(&mut self) -> BinaryImporter<'_, S> {
        BinaryImporter::new(self)
    }

    /// Create a document in `folder`, creating missing folders first, and
    /// set its display name.
    ///
    /// Returns the location of the new document's handle. A blank
    /// `localized_name` falls back to `name`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a bad folder location, type or name, or when
    ///   a segment of `folder` is not a folder
    /// - `IllegalState` when `add` or `localizeName` is unavailable
    /// - `Failure` when the store or a workflow fails
    pub fn create_document(
        &mut self,
        folder: &str,
        primary_type: &str,
        name: &str,
        locale: &str,
        localized_name: &str,
    ) -> Result<Location, ManagerError> {
        let cx = ErrorContext::new(Operation::CreateDocument, folder);
        self.guarded(&cx, |this| {
            let location = parse_location(&cx, folder)?;
            if primary_type.trim().is_empty() {
                return Err(cx.invalid("document type is blank"));
            }
            require_name(&cx, name)?;

            let mut ensured = this.ensure_folders(&cx, &location)?;
            let result = this.add_document(
                &cx,
                &mut ensured,
                primary_type,
                name,
                locale,
                localized_name,
            );
            if result.is_err() {
                this.abandon(&ensured);
            }
            result
        })
    }

    /// Start editing the document at `location`.
    ///
    /// Returns the draft variant, held by this session's user.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `location`
    /// - `IllegalState` when editing is unavailable, for example because a
    ///   draft is already open
    /// - `Failure` when the store or workflow fails
    pub fn obtain_editable_document(&mut self, location: &str) -> Result<Document, ManagerError> {
        let cx = ErrorContext::new(Operation::ObtainEditableDocument, location);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, location)?;
            let mut resolved = this.document(&cx, &handle, Action::ObtainEditableInstance)?;
            resolved
                .workflow
                .obtain_editable_instance()
                .map_err(|e| cx.failure(e))
        })
    }

    /// Bind `record` onto the draft variant `draft`.
    ///
    /// Properties matching the manager's binding filter are left alone.
    /// Nothing is saved: the changes stay pending until the draft is
    /// committed or the session is saved.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when `draft` does not exist or is not a draft
    /// - `Failure` when a value cannot be converted or the store fails
    pub fn update_editable_document(
        &mut self,
        draft: &Document,
        record: &ContentNode,
    ) -> Result<(), ManagerError> {
        let location = match draft.node(&self.store) {
            Ok(node) => node.location.to_string(),
            Err(_) => draft.id().to_string(),
        };
        let cx = ErrorContext::new(Operation::UpdateEditableDocument, location);
        self.guarded(&cx, |this| {
            let node = match draft.node(&this.store) {
                Ok(node) => node,
                Err(StoreError::UnknownId(_)) => {
                    return Err(cx.invalid("document does not exist"));
                }
                Err(e) => return Err(cx.failure(e)),
            };
            if node.state() != Some(VariantState::Draft) {
                return Err(cx.invalid("not a draft variant"));
            }

            this.binder
                .bind_with(
                    &mut this.store,
                    &node.id,
                    record,
                    &this.filter,
                    this.converter.as_ref(),
                )
                .map_err(|e| cx.failure(e))
        })
    }

    /// Discard the open draft of the document at `location`.
    ///
    /// Returns the variant editing fell back to.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `location`
    /// - `IllegalState` when no draft is held by this session's user
    /// - `Failure` when the store or workflow fails
    pub fn dispose_editable_document(&mut self, location: &str) -> Result<Document, ManagerError> {
        let cx = ErrorContext::new(Operation::DisposeEditableDocument, location);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, location)?;
            let mut resolved = this.document(&cx, &handle, Action::DisposeEditableInstance)?;
            resolved
                .workflow
                .dispose_editable_instance()
                .map_err(|e| cx.failure(e))
        })
    }

    /// Commit the open draft of the document at `location` into its
    /// unpublished variant.
    ///
    /// Pending draft edits are persisted with the commit. Returns the
    /// unpublished variant.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `location`
    /// - `IllegalState` when no draft is held by this session's user
    /// - `Failure` when the store or workflow fails
    pub fn commit_editable_document(&mut self, location: &str) -> Result<Document, ManagerError> {
        let cx = ErrorContext::new(Operation::CommitEditableDocument, location);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, location)?;
            let mut resolved = this.document(&cx, &handle, Action::CommitEditableInstance)?;
            resolved
                .workflow
                .commit_editable_instance()
                .map_err(|e| cx.failure(e))
        })
    }

    /// Publish the document at `location`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `location`
    /// - `IllegalState` when publishing is unavailable
    /// - `Failure` when the store or workflow fails
    pub fn publish_document(&mut self, location: &str) -> Result<bool, ManagerError> {
        let cx = ErrorContext::new(Operation::PublishDocument, location);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, location)?;
            let mut resolved = this.document(&cx, &handle, Action::Publish)?;
            resolved.workflow.publish().map_err(|e| cx.failure(e))?;
            Ok(true)
        })
    }

    /// Take the document at `location` offline.
    ///
    /// A document the workflow reports as not live is already offline: the
    /// call succeeds without invoking anything.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `location`
    /// - `IllegalState` when depublishing is unavailable
    /// - `Failure` when the store or workflow fails
    pub fn depublish_document(&mut self, location: &str) -> Result<bool, ManagerError> {
        let cx = ErrorContext::new(Operation::DepublishDocument, location);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, location)?;
            let mut resolved = this
                .resolver
                .document_workflow(&mut this.store, &handle)
                .map_err(|e| cx.failure(e))?;

            if resolved.hints.is_false(hint_keys::IS_LIVE) {
                debug!(location, "document is already offline");
                return Ok(true);
            }
            resolved
                .require(Action::Depublish)
                .map_err(|v| cx.illegal(v))?;
            resolved.workflow.depublish().map_err(|e| cx.failure(e))?;
            Ok(true)
        })
    }

    /// Delete the document at `location` with all its variants.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `location`
    /// - `IllegalState` when deleting is unavailable, for example while the
    ///   document is live
    /// - `Failure` when the store or workflow fails
    pub fn delete_document(&mut self, location: &str) -> Result<(), ManagerError> {
        let cx = ErrorContext::new(Operation::DeleteDocument, location);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, location)?;
            let mut resolved = this.document(&cx, &handle, Action::Delete)?;
            resolved.workflow.delete().map_err(|e| cx.failure(e))
        })
    }

    /// Copy the document at `source` to `target_folder/target_name`,
    /// creating missing target folders first.
    ///
    /// Returns the location of the copy.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when the source does not exist or is not a
    ///   document, or the target is invalid
    /// - `IllegalState` when copying or adding folders is unavailable
    /// - `Failure` when the store or workflow fails
    pub fn copy_document(
        &mut self,
        source: &str,
        target_folder: &str,
        target_name: &str,
    ) -> Result<Location, ManagerError> {
        let cx = ErrorContext::new(Operation::CopyDocument, source);
        self.guarded(&cx, |this| {
            let source_location = parse_location(&cx, source)?;
            let target = Location::new(target_folder)
                .map_err(|e| cx.invalid(format!("target folder: {e}")))?;
            require_name(&cx, target_name)?;
            let copied = target
                .join(target_name)
                .map_err(|e| cx.invalid(e.to_string()))?;

            let node = this.existing(&cx, &source_location, "source document does not exist")?;
            let handle = this
                .store
                .resolve_handle(&node)
                .map_err(|e| cx.failure(e))?
                .ok_or_else(|| cx.invalid("source is not a document"))?;

            let ensured = this.ensure_folders(&cx, &target)?;
            let result = this.copy_into(&cx, &handle, &ensured.folder, target_name, &copied);
            if result.is_err() {
                this.abandon(&ensured);
            }
            result
        })
    }

    /// Create the `language` translation of the folder at `source`, named
    /// `name`, under the translation of its parent folder.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when the source is missing or not a folder, or
    ///   the language or name is invalid
    /// - `IllegalState` when translating is unavailable
    /// - `Failure` when the store or workflow fails
    pub fn translate_folder(
        &mut self,
        source: &str,
        language: &str,
        name: &str,
    ) -> Result<Document, ManagerError> {
        let cx = ErrorContext::new(Operation::TranslateFolder, source);
        self.guarded(&cx, |this| {
            let location = parse_location(&cx, source)?;
            require_language(&cx, language)?;
            require_name(&cx, name)?;

            let folder = this.existing(&cx, &location, "folder does not exist")?;
            if !folder.is_folder() {
                return Err(cx.invalid("not a folder"));
            }
            this.translate(&cx, &folder, language, name)
        })
    }

    /// Create the `language` translation of the document at `source`,
    /// named `name`.
    ///
    /// The unpublished variant is translated if present, else the
    /// published one.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when no document exists at `source`, or the
    ///   language or name is invalid
    /// - `IllegalState` when the document has neither an unpublished nor a
    ///   published variant, or translating is unavailable
    /// - `Failure` when the store or workflow fails
    pub fn translate_document(
        &mut self,
        source: &str,
        language: &str,
        name: &str,
    ) -> Result<Document, ManagerError> {
        let cx = ErrorContext::new(Operation::TranslateDocument, source);
        self.guarded(&cx, |this| {
            let handle = this.handle_at(&cx, source)?;
            require_language(&cx, language)?;
            require_name(&cx, name)?;

            let variants = this
                .store
                .variants_by_state(&handle)
                .map_err(|e| cx.failure(e))?;
            let variant = translation_source(&variants)
                .cloned()
                .ok_or_else(|| cx.illegal(StateViolation::NoTranslatableVariant))?;
            this.translate(&cx, &variant, language, name)
        })
    }

    /// Run `op`, logging its outcome. Pending changes are discarded when it
    /// fails with `Failure`.
    fn guarded<T>(
        &mut self,
        cx: &ErrorContext,
        op: impl FnOnce(&mut Self) -> Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        debug!(operation = %cx.operation, location = %cx.location, "starting");
        let result = op(self);
        if let Err(err) = &result {
            error!(
                operation = %cx.operation,
                location = %cx.location,
                error = ?err,
                "operation failed"
            );
            if err.kind() == ErrorKind::Failure {
                discard_pending(&mut self.store);
            }
        }
        result
    }

    /// The node at `location`, or `InvalidArgument` with `missing`.
    fn existing(
        &self,
        cx: &ErrorContext,
        location: &Location,
        missing: &str,
    ) -> Result<Node, ManagerError> {
        if !self.store.node_exists(location).map_err(|e| cx.failure(e))? {
            return Err(cx.invalid(missing));
        }
        self.store.node(location).map_err(|e| cx.failure(e))
    }

    /// The handle of the document at `location`.
    fn handle_at(&self, cx: &ErrorContext, location: &str) -> Result<Node, ManagerError> {
        let location = parse_location(cx, location)?;
        let node = self.existing(cx, &location, "document does not exist")?;
        self.store
            .resolve_handle(&node)
            .map_err(|e| cx.failure(e))?
            .ok_or_else(|| cx.invalid("not a document"))
    }

    /// The document workflow on `handle`, gated for `action`.
    fn document(
        &mut self,
        cx: &ErrorContext,
        handle: &Node,
        action: Action,
    ) -> Result<Resolved<dyn DocumentWorkflow + '_>, ManagerError> {
        let resolved = self
            .resolver
            .document_workflow(&mut self.store, handle)
            .map_err(|e| cx.failure(e))?;
        resolved.require(action).map_err(|v| cx.illegal(v))?;
        Ok(resolved)
    }

    /// Make sure `location` exists as a folder, adding missing folders
    /// through the folder workflow of their parent. Anything created is
    /// removed again if a later segment fails.
    fn ensure_folders(
        &mut self,
        cx: &ErrorContext,
        location: &Location,
    ) -> Result<EnsuredFolder, ManagerError> {
        let mut created = None;
        match self.walk_folders(cx, location, &mut created) {
            Ok(folder) => Ok(EnsuredFolder { folder, created }),
            Err(err) => {
                if let Some(top) = &created {
                    undo_created(&mut self.store, top);
                }
                Err(err)
            }
        }
    }

    fn walk_folders(
        &mut self,
        cx: &ErrorContext,
        location: &Location,
        created: &mut Option<Node>,
    ) -> Result<Node, ManagerError> {
        let mut current = self
            .store
            .node(&Location::root())
            .map_err(|e| cx.failure(e))?;

        for name in location.segments() {
            current = match self.store.child(&current, name).map_err(|e| cx.failure(e))? {
                Some(existing) if existing.is_folder() => existing,
                Some(existing) => {
                    return Err(cx.invalid(format!("'{}' is not a folder", existing.location)));
                }
                None => {
                    let path = self.add_folder(cx, &current, name)?;
                    let folder = self.store.node(&path).map_err(|e| cx.failure(e))?;
                    debug!(path = %folder.location, "created missing folder");
                    if created.is_none() {
                        *created = Some(folder.clone());
                    }
                    folder
                }
            };
        }
        Ok(current)
    }

    fn add_folder(
        &mut self,
        cx: &ErrorContext,
        parent: &Node,
        name: &str,
    ) -> Result<Location, ManagerError> {
        let workflow = &self.config.workflow;
        let mut resolved = self
            .resolver
            .folder_workflow(&mut self.store, parent)
            .map_err(|e| cx.failure(e))?;
        resolved.require(Action::Add).map_err(|v| cx.illegal(v))?;
        resolved
            .workflow
            .add(&workflow.new_folder_category, &workflow.folder_type, name)
            .map_err(|e| cx.failure(e))
    }

    fn add_document(
        &mut self,
        cx: &ErrorContext,
        ensured: &mut EnsuredFolder,
        primary_type: &str,
        name: &str,
        locale: &str,
        localized_name: &str,
    ) -> Result<Location, ManagerError> {
        let path = {
            let category = &self.config.workflow.new_document_category;
            let mut resolved = self
                .resolver
                .folder_workflow(&mut self.store, &ensured.folder)
                .map_err(|e| cx.failure(e))?;
            resolved.require(Action::Add).map_err(|v| cx.illegal(v))?;
            resolved
                .workflow
                .add(category, primary_type, name)
                .map_err(|e| cx.failure(e))?
        };

        let handle = self.store.node(&path).map_err(|e| cx.failure(e))?;
        if ensured.created.is_none() {
            ensured.created = Some(handle.clone());
        }

        let display = if localized_name.trim().is_empty() {
            name
        } else {
            localized_name
        };
        let mut resolved = self
            .resolver
            .default_workflow(&mut self.store, &handle)
            .map_err(|e| cx.failure(e))?;
        resolved
            .require(Action::LocalizeName)
            .map_err(|v| cx.illegal(v))?;
        resolved
            .workflow
            .localize_name(locale, display)
            .map_err(|e| cx.failure(e))?;
        Ok(path)
    }

    fn copy_into(
        &mut self,
        cx: &ErrorContext,
        handle: &Node,
        folder: &Node,
        name: &str,
        copied: &Location,
    ) -> Result<Location, ManagerError> {
        let mut resolved = self.document(cx, handle, Action::Copy)?;
        resolved
            .workflow
            .copy(&Document::from(folder), name)
            .map_err(|e| cx.failure(e))?;
        drop(resolved);

        let node = self.store.node(copied).map_err(|e| cx.failure(e))?;
        Ok(node.location)
    }

    fn translate(
        &mut self,
        cx: &ErrorContext,
        node: &Node,
        language: &str,
        name: &str,
    ) -> Result<Document, ManagerError> {
        let mut resolved = self
            .resolver
            .translation_workflow(&mut self.store, node)
            .map_err(|e| cx.failure(e))?;
        resolved
            .require(Action::AddTranslation)
            .map_err(|v| cx.illegal(v))?;
        resolved
            .workflow
            .add_translation(language, name)
            .map_err(|e| cx.failure(e))
    }

    /// Remove whatever a failed operation created on its way.
    fn abandon(&mut self, ensured: &EnsuredFolder) {
        if let Some(top) = &ensured.created {
            let result = undo_created(&mut self.store, top);
            debug!(summary = %result.summary(), "abandoned created nodes");
        }
    }
}

pub(super) fn parse_location(cx: &ErrorContext, text: &str) -> Result<Location, ManagerError> {
    if text.trim().is_empty() {
        return Err(cx.invalid("location is blank"));
    }
    Location::new(text).map_err(|e| cx.invalid(e.to_string()))
}

pub(super) fn require_name(cx: &ErrorContext, name: &str) -> Result<(), ManagerError> {
    if Location::is_valid_name(name) {
        Ok(())
    } else {
        Err(cx.invalid(format!("'{name}' is not a valid node name")))
    }
}

fn require_language(cx: &ErrorContext, language: &str) -> Result<(), ManagerError> {
    if language.trim().is_empty() {
        return Err(cx.invalid("language is blank"));
    }
    Ok(())
}
