//! core::config::schema
//!
//! Configuration schema types.
//!
//! Every section and field is optional in the file; missing values take the
//! defaults documented on each field. Unknown fields are rejected so a typo
//! never silently falls back to a default.
//!
//! # Validation
//!
//! Values are validated after parsing: category names must not be blank and
//! exclude patterns must be well-formed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::binding::filter::ExcludePattern;
use crate::binding::record::{META_NODE_LOCALIZED_NAME, META_NODE_NAME, META_NODE_PATH};

/// Complete coordinator configuration.
///
/// # Example
///
/// ```toml
/// [workflow]
/// folder = "threepane"
/// document = "default"
///
/// [binding]
/// property_excludes = ["hippo:*", "hippostd:*", "hippostdpubwf:*"]
///
/// [binary.fallbacks."hippogallery:stdImageGallery"]
/// folder_types = ["new-image-folder"]
/// gallery_types = ["hippogallery:imageset"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Workflow category names and folder creation settings.
    pub workflow: WorkflowConfig,

    /// Binding filter for document content.
    pub binding: BindingConfig,

    /// Binary import settings.
    pub binary: BinaryConfig,
}

impl ManagerConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.workflow.validate()?;
        validate_patterns("binding.property_excludes", &self.binding.property_excludes)?;
        validate_patterns("binding.node_excludes", &self.binding.node_excludes)?;
        validate_patterns("binary.property_excludes", &self.binary.property_excludes)?;
        validate_patterns("binary.node_excludes", &self.binary.node_excludes)?;
        Ok(())
    }
}

/// Workflow category names, as registered in the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// Category of the folder workflow (default: `threepane`).
    pub folder: String,
    /// Category of the document workflow (default: `default`).
    pub document: String,
    /// Category of the default workflow used to localize names (default: `core`).
    pub default: String,
    /// Category of the folder translation workflow (default: `translation`).
    pub folder_translation: String,
    /// Category of the document translation workflow (default: `translation`).
    pub document_translation: String,
    /// Folder `add` category that creates a document (default: `new-document`).
    pub new_document_category: String,
    /// Folder `add` category that creates a subfolder (default: `new-translated-folder`).
    pub new_folder_category: String,
    /// Node type of folders created for missing path segments (default: `hippostd:folder`).
    pub folder_type: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            folder: "threepane".to_string(),
            document: "default".to_string(),
            default: "core".to_string(),
            folder_translation: "translation".to_string(),
            document_translation: "translation".to_string(),
            new_document_category: "new-document".to_string(),
            new_folder_category: "new-translated-folder".to_string(),
            folder_type: "hippostd:folder".to_string(),
        }
    }
}

impl WorkflowConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("workflow.folder", &self.folder),
            ("workflow.document", &self.document),
            ("workflow.default", &self.default),
            ("workflow.folder_translation", &self.folder_translation),
            ("workflow.document_translation", &self.document_translation),
            ("workflow.new_document_category", &self.new_document_category),
            ("workflow.new_folder_category", &self.new_folder_category),
            ("workflow.folder_type", &self.folder_type),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!("{name} cannot be blank")));
            }
        }
        Ok(())
    }
}

/// Exclusions applied when binding source records onto documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BindingConfig {
    /// Property name patterns never overwritten by binding.
    pub property_excludes: Vec<String>,
    /// Child node name patterns never overwritten by binding.
    pub node_excludes: Vec<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            property_excludes: vec![
                "hippo:*".to_string(),
                "hippostd:*".to_string(),
                "hippostdpubwf:*".to_string(),
            ],
            node_excludes: Vec::new(),
        }
    }
}

/// Binary import settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BinaryConfig {
    /// Property name patterns never overwritten when binding binaries.
    pub property_excludes: Vec<String>,
    /// Child node name patterns never overwritten when binding binaries.
    pub node_excludes: Vec<String>,
    /// Folder/gallery types used for a gallery folder type when the caller
    /// supplies none, keyed by the folder's node type.
    pub fallbacks: BTreeMap<String, GalleryFallback>,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        let property_excludes = [
            META_NODE_NAME,
            META_NODE_LOCALIZED_NAME,
            META_NODE_PATH,
            "hippostdpubwf:*",
            "hippo:availability",
            "hippo:paths",
            "hippo:related",
            "hippostd:holder",
            "hippostd:state",
            "hippostd:stateSummary",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut fallbacks = BTreeMap::new();
        fallbacks.insert(
            "hippogallery:stdImageGallery".to_string(),
            GalleryFallback {
                folder_types: vec!["new-image-folder".to_string()],
                gallery_types: vec!["hippogallery:imageset".to_string()],
            },
        );
        fallbacks.insert(
            "hippogallery:stdAssetGallery".to_string(),
            GalleryFallback {
                folder_types: vec!["new-file-folder".to_string()],
                gallery_types: vec!["hippogallery:exampleAssetSet".to_string()],
            },
        );

        Self {
            property_excludes,
            node_excludes: Vec::new(),
            fallbacks,
        }
    }
}

impl BinaryConfig {
    /// The fallback for a gallery folder type, if configured.
    pub fn fallback_for(&self, folder_type: &str) -> Option<&GalleryFallback> {
        self.fallbacks.get(folder_type)
    }
}

/// Default folder and gallery types for one gallery folder type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryFallback {
    /// Values for `hippostd:foldertype`.
    pub folder_types: Vec<String>,
    /// Values for `hippostd:gallerytype`.
    pub gallery_types: Vec<String>,
}

fn validate_patterns(field: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        ExcludePattern::parse(pattern)
            .map_err(|e| ConfigError::InvalidValue(format!("{field}: {e}")))?;
    }
    Ok(())
}
