//! binding::record
//!
//! Source records: repository-agnostic trees of named field values.
//!
//! A record is supplied by the caller (typically parsed from an export
//! file) and bound onto a node by a [`FieldBinder`](super::binder::FieldBinder).
//! Values are kept in their textual form until binding, where a
//! [`ValueConverter`](super::binder::ValueConverter) turns them into typed
//! property values.
//!
//! # JSON form
//!
//! ```
//! use content_lifecycle::binding::record::ContentNode;
//!
//! let record: ContentNode = serde_json::from_str(r#"{
//!     "name": "article",
//!     "primaryType": "myapp:article",
//!     "properties": [
//!         { "name": "myapp:title", "type": "STRING", "values": ["Hello"] }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(record.property("myapp:title").unwrap().values, vec!["Hello"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::core::value::PropertyType;

/// Metadata field carrying the node name of the exported item.
pub const META_NODE_NAME: &str = "jcr:name";
/// Metadata field carrying the localized display name of the exported item.
pub const META_NODE_LOCALIZED_NAME: &str = "jcr:localizedName";
/// Metadata field carrying the repository path of the exported item.
pub const META_NODE_PATH: &str = "jcr:path";

/// Whether `name` is a metadata field describing the exported item rather
/// than content of it.
pub fn is_metadata(name: &str) -> bool {
    matches!(name, META_NODE_NAME | META_NODE_LOCALIZED_NAME | META_NODE_PATH)
}

/// A node in a source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Node name.
    pub name: String,
    /// Primary node type.
    pub primary_type: String,
    /// Mixin types to add to the target.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixin_types: Vec<String>,
    /// Properties, in record order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ContentProperty>,
    /// Child nodes, in record order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ContentNode>,
}

impl ContentNode {
    /// Create an empty node.
    pub fn new(name: impl Into<String>, primary_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_type: primary_type.into(),
            mixin_types: Vec::new(),
            properties: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Add a mixin type.
    pub fn with_mixin(mut self, mixin: impl Into<String>) -> Self {
        self.mixin_types.push(mixin.into());
        self
    }

    /// Add or replace a property.
    pub fn with_property(mut self, property: ContentProperty) -> Self {
        self.set_property(property);
        self
    }

    /// Add a child node.
    pub fn with_node(mut self, node: ContentNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add or replace a property by name.
    pub fn set_property(&mut self, property: ContentProperty) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }

    /// Get a property by name.
    pub fn property(&self, name: &str) -> Option<&ContentProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Get the first child node with the given name.
    pub fn node(&self, name: &str) -> Option<&ContentNode> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// A property in a source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProperty {
    /// Property name, in `namespace:local` form.
    pub name: String,
    /// Declared type of the values.
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Whether the property is multi-valued.
    #[serde(default)]
    pub multiple: bool,
    /// Textual values.
    #[serde(default)]
    pub values: Vec<String>,
}

impl ContentProperty {
    /// Single-valued property of the given type.
    pub fn new(
        name: impl Into<String>,
        property_type: PropertyType,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            property_type,
            multiple: false,
            values: vec![value.into()],
        }
    }

    /// Multi-valued property of the given type.
    pub fn multiple<I, S>(name: impl Into<String>, property_type: PropertyType, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            property_type,
            multiple: true,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Single-valued string property.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, PropertyType::String, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_property_replaces_by_name() {
        let mut node = ContentNode::new("doc", "myapp:article")
            .with_property(ContentProperty::string("myapp:title", "A"));
        node.set_property(ContentProperty::string("myapp:title", "B"));

        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.property("myapp:title").unwrap().values, vec!["B"]);
    }

    #[test]
    fn builder_collects_children() {
        let node = ContentNode::new("image", "hippogallery:imageset")
            .with_mixin("mix:referenceable")
            .with_node(ContentNode::new("hippogallery:original", "hippogallery:image"));

        assert_eq!(node.mixin_types, vec!["mix:referenceable"]);
        assert!(node.node("hippogallery:original").is_some());
        assert!(node.node("hippogallery:thumbnail").is_none());
    }

    #[test]
    fn metadata_names() {
        assert!(is_metadata("jcr:name"));
        assert!(is_metadata("jcr:path"));
        assert!(!is_metadata("jcr:data"));
    }

    #[test]
    fn json_defaults_for_optional_fields() {
        let node: ContentNode =
            serde_json::from_str(r#"{"name":"doc","primaryType":"myapp:article"}"#).unwrap();
        assert!(node.properties.is_empty());
        assert!(node.nodes.is_empty());
        assert!(node.mixin_types.is_empty());
    }

    #[test]
    fn json_property_shape() {
        let property = ContentProperty::multiple("myapp:tags", PropertyType::String, ["a", "b"]);
        let json = serde_json::to_value(&property).unwrap();
        assert_eq!(json["type"], "STRING");
        assert_eq!(json["multiple"], true);
        assert_eq!(json["values"][1], "b");
    }
}
