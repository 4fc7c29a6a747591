//! core::node
//!
//! Owned snapshots of repository nodes and the well-known names the
//! lifecycle layer reads from them.
//!
//! # Design
//!
//! A [`Node`] is a value, not a live reference into the store. Reading a
//! node copies its current state; every mutation goes back through the
//! store by [`NodeId`]. This keeps borrowing simple and makes it explicit
//! that a snapshot can go stale after any workflow action.

use std::collections::{BTreeMap, BTreeSet};

use super::types::{Location, NodeId, VariantState};
use super::value::PropertyValue;

/// Node type names.
pub mod node_types {
    /// Root node of the repository.
    pub const ROOT: &str = "rep:root";
    /// A handle grouping the variants of one document.
    pub const HANDLE: &str = "hippo:handle";
    /// A standard content folder.
    pub const FOLDER: &str = "hippostd:folder";
    /// An unordered content folder.
    pub const DIRECTORY: &str = "hippostd:directory";
}

/// Mixin type names.
pub mod mixins {
    pub const REFERENCEABLE: &str = "mix:referenceable";
    pub const TRANSLATED: &str = "hippotranslation:translated";
}

/// Property names owned by the repository.
pub mod props {
    pub const STATE: &str = "hippostd:state";
    pub const HOLDER: &str = "hippostd:holder";
    pub const AVAILABILITY: &str = "hippo:availability";
    pub const DISPLAY_NAME: &str = "hippo:name";
    pub const FOLDER_TYPE: &str = "hippostd:foldertype";
    pub const GALLERY_TYPE: &str = "hippostd:gallerytype";
    pub const TRANSLATION_ID: &str = "hippotranslation:id";
    pub const TRANSLATION_LOCALE: &str = "hippotranslation:locale";
    pub const CREATED_BY: &str = "hippostdpubwf:createdBy";
    pub const CREATION_DATE: &str = "hippostdpubwf:creationDate";
    pub const LAST_MODIFIED_BY: &str = "hippostdpubwf:lastModifiedBy";
    pub const LAST_MODIFICATION_DATE: &str = "hippostdpubwf:lastModificationDate";
    pub const PUBLICATION_DATE: &str = "hippostdpubwf:publicationDate";
}

/// Availability markers stored in `hippo:availability`.
pub mod availability {
    pub const LIVE: &str = "live";
    pub const PREVIEW: &str = "preview";
}

/// A snapshot of one repository node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable identifier.
    pub id: NodeId,
    /// Node name (last path segment).
    pub name: String,
    /// Absolute location at the time of the snapshot.
    pub location: Location,
    /// Primary node type.
    pub primary_type: String,
    /// Mixin types.
    pub mixins: BTreeSet<String>,
    /// Properties by name.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    /// Get a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Get a single string property by name.
    pub fn string_property(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(PropertyValue::as_str)
    }

    /// Whether the node carries the given mixin.
    pub fn has_mixin(&self, mixin: &str) -> bool {
        self.mixins.contains(mixin)
    }

    /// Whether this node is a document handle.
    pub fn is_handle(&self) -> bool {
        self.primary_type == node_types::HANDLE
    }

    /// Whether this node can hold documents and subfolders.
    ///
    /// Standard folders and directories qualify, as does any node that
    /// declares which folder types it accepts (gallery folders).
    pub fn is_folder(&self) -> bool {
        self.primary_type == node_types::FOLDER
            || self.primary_type == node_types::DIRECTORY
            || self.properties.contains_key(props::FOLDER_TYPE)
    }

    /// The variant state, if this node is a document variant.
    pub fn state(&self) -> Option<VariantState> {
        self.string_property(props::STATE)
            .and_then(|s| s.parse().ok())
    }

    /// The actor currently holding this variant for editing.
    pub fn holder(&self) -> Option<&str> {
        self.string_property(props::HOLDER)
    }

    /// Whether `hippo:availability` lists `marker`.
    pub fn is_available_in(&self, marker: &str) -> bool {
        self.property(props::AVAILABILITY)
            .map(|v| v.contains_str(marker))
            .unwrap_or(false)
    }

    /// The translation locale, if the node is translated.
    pub fn locale(&self) -> Option<&str> {
        self.string_property(props::TRANSLATION_LOCALE)
    }

    /// The translation id shared by all translations of this node.
    pub fn translation_id(&self) -> Option<&str> {
        self.string_property(props::TRANSLATION_ID)
    }
}
