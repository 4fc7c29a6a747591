//! engine::binary
//!
//! The binary asset coordinator: gallery folders and binary handles.
//!
//! Binaries (images, files) live in gallery folders rather than document
//! folders, and are written directly through the session instead of
//! through document workflows. Each binary is a handle holding a single
//! content set of the same name, available in both `live` and `preview`.
//!
//! # Rollback
//!
//! Every error raised once an import has started discards all pending
//! session changes before it is returned, whatever its kind. A failing
//! rollback is logged and the original error is still returned.

use tracing::{debug, error};

use super::error::{ErrorContext, ManagerError, Operation};
use super::manager::{parse_location, require_name, DocumentManager};
use super::rollback::discard_pending;
use crate::binding::{BindingFilter, ContentNode};
use crate::core::node::{availability, mixins, node_types, props, Node};
use crate::core::types::Location;
use crate::core::value::PropertyValue;
use crate::store::ContentStore;

/// Imports binaries through a [`DocumentManager`]'s session.
///
/// Obtained from [`DocumentManager::binary_importer`]. Binding uses the
/// manager's binder and value converter with the binary filter, which also
/// keeps record metadata and repository-owned state off the content set.
pub struct BinaryImporter<'m, S: ContentStore> {
    manager: &'m mut DocumentManager<S>,
}

impl<'m, S: ContentStore> BinaryImporter<'m, S> {
    pub(super) fn new(manager: &'m mut DocumentManager<S>) -> Self {
        Self { manager }
    }

    /// The filter applied when binding binary content.
    pub fn filter(&self) -> &BindingFilter {
        &self.manager.binary_filter
    }

    /// Create the gallery folder at `location`, adding every missing
    /// segment as a folder of `primary_type`.
    ///
    /// New folders are referenceable and carry `folder_types` and
    /// `gallery_types`. When either list is empty, the configured fallback
    /// for `primary_type` is used instead. The session is saved on success.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a bad location or type, or when a segment is
    ///   a document handle
    /// - `Failure` when the store fails
    pub fn create_or_update_binary_folder(
        &mut self,
        location: &str,
        primary_type: &str,
        folder_types: &[&str],
        gallery_types: &[&str],
    ) -> Result<Location, ManagerError> {
        let cx = ErrorContext::new(Operation::CreateBinaryFolder, location);
        let target = parse_location(&cx, location)?;
        if primary_type.trim().is_empty() {
            return Err(cx.invalid("folder type is blank"));
        }
        let (folder_types, gallery_types) =
            self.types_for(primary_type, folder_types, gallery_types);

        self.rolled_back(&cx, |store| {
            let mut current = store.node(&Location::root()).map_err(|e| cx.failure(e))?;
            for name in target.segments() {
                current = match store.child(&current, name).map_err(|e| cx.failure(e))? {
                    Some(existing) if existing.is_handle() => {
                        return Err(cx.invalid(format!(
                            "'{}' is a document, not a folder",
                            existing.location
                        )));
                    }
                    Some(existing) => existing,
                    None => add_binary_folder(
                        store,
                        &current,
                        name,
                        primary_type,
                        &folder_types,
                        &gallery_types,
                    )
                    .map_err(|e| cx.failure(e))?,
                };
            }
            store.save().map_err(|e| cx.failure(e))?;
            Ok(current.location)
        })
    }

    /// Import `record` as the binary `name` in the gallery folder `folder`.
    ///
    /// A missing binary is created as a referenceable handle holding a
    /// referenceable content set of `primary_type`, available in `live` and
    /// `preview`. An existing one is updated in place. The record is bound
    /// onto the content set and the session saved.
    ///
    /// Returns the location of the handle.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a bad or missing folder, a bad name or type,
    ///   or when `name` is taken by something other than a binary handle
    /// - `Failure` when binding or the store fails
    pub fn create_or_update_binary_from_content_node(
        &mut self,
        record: &ContentNode,
        primary_type: &str,
        folder: &str,
        name: &str,
    ) -> Result<Location, ManagerError> {
        let cx = ErrorContext::new(Operation::ImportBinary, folder);
        let location = parse_location(&cx, folder)?;
        require_name(&cx, name)?;
        if primary_type.trim().is_empty() {
            return Err(cx.invalid("binary type is blank"));
        }

        debug!(operation = %cx.operation, location = %cx.location, "starting");
        let result = self.import(&cx, &location, record, primary_type, name);
        self.finish(&cx, result)
    }

    fn import(
        &mut self,
        cx: &ErrorContext,
        location: &Location,
        record: &ContentNode,
        primary_type: &str,
        name: &str,
    ) -> Result<Location, ManagerError> {
        let manager = &mut *self.manager;
        let store = &mut manager.store;
        if !store.node_exists(location).map_err(|e| cx.failure(e))? {
            return Err(cx.invalid("binary folder does not exist"));
        }
        let parent = store.node(location).map_err(|e| cx.failure(e))?;

        let handle = match store.child(&parent, name).map_err(|e| cx.failure(e))? {
            Some(existing) if existing.is_handle() => {
                debug!(path = %existing.location, "reusing binary handle");
                existing
            }
            Some(existing) => {
                return Err(cx.invalid(format!(
                    "'{}' exists and is not a binary handle",
                    existing.location
                )));
            }
            None => add_binary_handle(store, &parent, name, primary_type)
                .map_err(|e| cx.failure(e))?,
        };
        let set = store
            .child(&handle, name)
            .map_err(|e| cx.failure(e))?
            .ok_or_else(|| cx.invalid("binary handle has no content set"))?;

        manager
            .binder
            .bind_with(
                &mut manager.store,
                &set.id,
                record,
                &manager.binary_filter,
                manager.converter.as_ref(),
            )
            .map_err(|e| cx.failure(e))?;
        manager.store.save().map_err(|e| cx.failure(e))?;
        Ok(handle.location)
    }

    fn types_for(
        &self,
        primary_type: &str,
        folder_types: &[&str],
        gallery_types: &[&str],
    ) -> (Vec<String>, Vec<String>) {
        let fallback = self.manager.config.binary.fallback_for(primary_type);
        let pick = |given: &[&str], fallback: Option<&Vec<String>>| {
            if given.is_empty() {
                fallback.cloned().unwrap_or_default()
            } else {
                given.iter().map(|s| s.to_string()).collect()
            }
        };
        (
            pick(folder_types, fallback.map(|f| &f.folder_types)),
            pick(gallery_types, fallback.map(|f| &f.gallery_types)),
        )
    }

    /// Run `op` against the session, discarding pending changes on any error.
    fn rolled_back<T>(
        &mut self,
        cx: &ErrorContext,
        op: impl FnOnce(&mut S) -> Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        debug!(operation = %cx.operation, location = %cx.location, "starting");
        let result = op(&mut self.manager.store);
        self.finish(cx, result)
    }

    fn finish<T>(
        &mut self,
        cx: &ErrorContext,
        result: Result<T, ManagerError>,
    ) -> Result<T, ManagerError> {
        if let Err(err) = &result {
            error!(
                operation = %cx.operation,
                location = %cx.location,
                error = ?err,
                "operation failed"
            );
            discard_pending(&mut self.manager.store);
        }
        result
    }
}

fn add_binary_folder<S: ContentStore + ?Sized>(
    store: &mut S,
    parent: &Node,
    name: &str,
    primary_type: &str,
    folder_types: &[String],
    gallery_types: &[String],
) -> Result<Node, crate::store::StoreError> {
    let folder = store.add_node(&parent.id, name, primary_type)?;
    store.add_mixin(&folder.id, mixins::REFERENCEABLE)?;
    store.set_property(&folder.id, props::FOLDER_TYPE, PropertyValue::strings(folder_types))?;
    store.set_property(&folder.id, props::GALLERY_TYPE, PropertyValue::strings(gallery_types))?;
    debug!(path = %folder.location, "created binary folder");
    store.node_by_id(&folder.id)
}

fn add_binary_handle<S: ContentStore + ?Sized>(
    store: &mut S,
    folder: &Node,
    name: &str,
    primary_type: &str,
) -> Result<Node, crate::store::StoreError> {
    let handle = store.add_node(&folder.id, name, node_types::HANDLE)?;
    store.add_mixin(&handle.id, mixins::REFERENCEABLE)?;

    let set = store.add_node(&handle.id, name, primary_type)?;
    store.add_mixin(&set.id, mixins::REFERENCEABLE)?;
    store.set_property(
        &set.id,
        props::AVAILABILITY,
        PropertyValue::strings([availability::LIVE, availability::PREVIEW]),
    )?;
    debug!(path = %handle.location, "created binary handle");
    Ok(handle)
}
