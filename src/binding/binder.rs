//! binding::binder
//!
//! Applies source records onto repository nodes.
//!
//! # Atomicity
//!
//! Binding runs in two phases. The whole record is first converted into a
//! plan (every value converted, every child name checked) without touching
//! the store; only a fully valid plan is applied. An unconvertible value
//! therefore fails the bind before any write.
//!
//! Applying writes pending changes through the [`ContentStore`]; persisting
//! (or discarding) them is the caller's decision.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::filter::BindingFilter;
use super::record::{is_metadata, ContentNode, ContentProperty};
use crate::core::types::{Location, NodeId};
use crate::core::value::{PropertyType, PropertyValue, Value};
use crate::store::{ContentStore, StoreError};

/// Errors from binding a source record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("cannot convert value '{value}' of property '{property}' to {expected}")]
    Conversion {
        property: String,
        value: String,
        expected: PropertyType,
    },

    #[error("property '{property}' is single-valued but has {count} values")]
    Cardinality { property: String, count: usize },

    #[error("'{0}' is not a valid node name")]
    InvalidNodeName(String),

    #[error("store rejected binding")]
    Store(#[from] StoreError),
}

/// Converts textual record values into typed property values.
pub trait ValueConverter {
    /// Convert one record property.
    fn convert(&self, property: &ContentProperty) -> Result<PropertyValue, BindError>;
}

/// Converter for the standard property types.
///
/// - `BOOLEAN`: `true`/`false`, case-insensitive
/// - `DATE`: RFC 3339
/// - `BINARY`: a `data:` URL; base64 payloads are decoded, others taken verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultValueConverter;

impl DefaultValueConverter {
    fn convert_value(&self, property: &ContentProperty, text: &str) -> Result<Value, BindError> {
        let invalid = || BindError::Conversion {
            property: property.name.clone(),
            value: text.to_string(),
            expected: property.property_type,
        };
        match property.property_type {
            PropertyType::String => Ok(Value::String(text.to_string())),
            PropertyType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            PropertyType::Long => text.trim().parse().map(Value::Long).map_err(|_| invalid()),
            PropertyType::Double => text.trim().parse().map(Value::Double).map_err(|_| invalid()),
            PropertyType::Date => DateTime::parse_from_rfc3339(text.trim())
                .map(|date| Value::Date(date.with_timezone(&Utc)))
                .map_err(|_| invalid()),
            PropertyType::Binary => decode_data_url(text).map(Value::Binary).ok_or_else(invalid),
        }
    }
}

impl ValueConverter for DefaultValueConverter {
    fn convert(&self, property: &ContentProperty) -> Result<PropertyValue, BindError> {
        if property.multiple {
            let values = property
                .values
                .iter()
                .map(|text| self.convert_value(property, text))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PropertyValue::Multiple(values));
        }
        match property.values.as_slice() {
            [single] => Ok(PropertyValue::Single(self.convert_value(property, single)?)),
            values => Err(BindError::Cardinality {
                property: property.name.clone(),
                count: values.len(),
            }),
        }
    }
}

/// Decode `data:[<mediatype>][;base64],<payload>`.
fn decode_data_url(text: &str) -> Option<Vec<u8>> {
    let rest = text.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if header.ends_with(";base64") {
        STANDARD.decode(payload).ok()
    } else {
        Some(payload.as_bytes().to_vec())
    }
}

/// Binds source records onto nodes.
pub trait FieldBinder {
    /// Bind `source` onto `target` using the [`DefaultValueConverter`].
    fn bind(
        &self,
        store: &mut dyn ContentStore,
        target: &NodeId,
        source: &ContentNode,
        filter: &BindingFilter,
    ) -> Result<(), BindError> {
        self.bind_with(store, target, source, filter, &DefaultValueConverter)
    }

    /// Bind `source` onto `target`, converting values with `converter`.
    ///
    /// Every property and child node accepted by `filter` is written;
    /// excluded items and record metadata fields never are.
    fn bind_with(
        &self,
        store: &mut dyn ContentStore,
        target: &NodeId,
        source: &ContentNode,
        filter: &BindingFilter,
        converter: &dyn ValueConverter,
    ) -> Result<(), BindError>;
}

/// Plan-then-apply binder.
///
/// Mixins are added, accepted properties overwritten, and accepted child
/// nodes replaced: existing children sharing a name with a record child are
/// removed and rebuilt from the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFieldBinder;

#[derive(Debug)]
struct BindPlan {
    mixins: Vec<String>,
    properties: Vec<(String, PropertyValue)>,
    nodes: Vec<ChildPlan>,
}

#[derive(Debug)]
struct ChildPlan {
    name: String,
    primary_type: String,
    plan: BindPlan,
}

impl DefaultFieldBinder {
    fn plan(
        source: &ContentNode,
        filter: &BindingFilter,
        converter: &dyn ValueConverter,
    ) -> Result<BindPlan, BindError> {
        let properties = source
            .properties
            .iter()
            .filter(|p| !is_metadata(&p.name) && filter.accepts_property(&p.name))
            .map(|p| Ok((p.name.clone(), converter.convert(p)?)))
            .collect::<Result<Vec<_>, BindError>>()?;

        let mut nodes = Vec::new();
        for child in source.nodes.iter().filter(|n| filter.accepts_node(&n.name)) {
            if !Location::is_valid_name(&child.name) {
                return Err(BindError::InvalidNodeName(child.name.clone()));
            }
            nodes.push(ChildPlan {
                name: child.name.clone(),
                primary_type: child.primary_type.clone(),
                plan: Self::plan(child, filter, converter)?,
            });
        }

        Ok(BindPlan {
            mixins: source.mixin_types.clone(),
            properties,
            nodes,
        })
    }

    fn apply(store: &mut dyn ContentStore, target: &NodeId, plan: BindPlan) -> Result<(), BindError> {
        let node = store.node_by_id(target)?;
        for mixin in &plan.mixins {
            if !node.has_mixin(mixin) {
                store.add_mixin(target, mixin)?;
            }
        }

        for (name, value) in plan.properties {
            store.set_property(target, &name, value)?;
        }

        for existing in store.children(&node)? {
            if plan.nodes.iter().any(|child| child.name == existing.name) {
                store.remove_node(&existing.id)?;
            }
        }
        for child in plan.nodes {
            let created = store.add_node(target, &child.name, &child.primary_type)?;
            Self::apply(store, &created.id, child.plan)?;
        }
        Ok(())
    }
}

impl FieldBinder for DefaultFieldBinder {
    fn bind_with(
        &self,
        store: &mut dyn ContentStore,
        target: &NodeId,
        source: &ContentNode,
        filter: &BindingFilter,
        converter: &dyn ValueConverter,
    ) -> Result<(), BindError> {
        let plan = Self::plan(source, filter, converter)?;
        Self::apply(store, target, plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{props, Node};
    use crate::store::memory::MemoryStore;

    fn store_with_target() -> (MemoryStore, Node) {
        let mut store = MemoryStore::new();
        let target = store.seed_folder("/content/target", None).unwrap();
        store
            .set_property(&target.id, props::STATE, PropertyValue::string("draft"))
            .unwrap();
        store.save().unwrap();
        (store, target)
    }

    mod converter {
        use super::*;

        fn convert(property: ContentProperty) -> Result<PropertyValue, BindError> {
            DefaultValueConverter.convert(&property)
        }

        #[test]
        fn scalar_types() {
            assert_eq!(
                convert(ContentProperty::new("b", PropertyType::Boolean, "TRUE")).unwrap(),
                PropertyValue::Single(Value::Boolean(true))
            );
            assert_eq!(
                convert(ContentProperty::new("l", PropertyType::Long, " 42 ")).unwrap(),
                PropertyValue::Single(Value::Long(42))
            );
            assert_eq!(
                convert(ContentProperty::new("d", PropertyType::Double, "2.5")).unwrap(),
                PropertyValue::Single(Value::Double(2.5))
            );
        }

        #[test]
        fn dates_are_normalized_to_utc() {
            let value = convert(ContentProperty::new(
                "date",
                PropertyType::Date,
                "2024-03-01T12:00:00+02:00",
            ))
            .unwrap();
            match value {
                PropertyValue::Single(Value::Date(date)) => {
                    assert_eq!(date.to_rfc3339(), "2024-03-01T10:00:00+00:00")
                }
                other => panic!("expected a date, got {other:?}"),
            }
        }

        #[test]
        fn binary_data_urls() {
            assert_eq!(
                convert(ContentProperty::new(
                    "jcr:data",
                    PropertyType::Binary,
                    "data:text/plain;base64,aGVsbG8="
                ))
                .unwrap(),
                PropertyValue::Single(Value::Binary(b"hello".to_vec()))
            );
            assert_eq!(
                convert(ContentProperty::new("jcr:data", PropertyType::Binary, "data:,hi")).unwrap(),
                PropertyValue::Single(Value::Binary(b"hi".to_vec()))
            );
            assert!(convert(ContentProperty::new(
                "jcr:data",
                PropertyType::Binary,
                "file:///tmp/x"
            ))
            .is_err());
        }

        #[test]
        fn conversion_error_names_property() {
            let err = convert(ContentProperty::new("myapp:count", PropertyType::Long, "many"))
                .unwrap_err();
            assert_eq!(
                err,
                BindError::Conversion {
                    property: "myapp:count".to_string(),
                    value: "many".to_string(),
                    expected: PropertyType::Long,
                }
            );
        }

        #[test]
        fn cardinality() {
            let mut property = ContentProperty::string("myapp:title", "a");
            property.values.push("b".to_string());
            assert!(matches!(
                convert(property),
                Err(BindError::Cardinality { count: 2, .. })
            ));

            let mut empty = ContentProperty::string("myapp:title", "a");
            empty.values.clear();
            assert!(matches!(
                convert(empty),
                Err(BindError::Cardinality { count: 0, .. })
            ));

            let multiple =
                ContentProperty::multiple("myapp:tags", PropertyType::String, Vec::<String>::new());
            assert_eq!(convert(multiple).unwrap(), PropertyValue::Multiple(Vec::new()));
        }
    }

    mod binding {
        use super::*;

        #[test]
        fn excluded_properties_untouched() {
            let (mut store, target) = store_with_target();
            let record = ContentNode::new("target", "myapp:article")
                .with_property(ContentProperty::string(props::STATE, "published"))
                .with_property(ContentProperty::string("myapp:title", "Hello"));

            DefaultFieldBinder
                .bind(&mut store, &target.id, &record, &BindingFilter::document_default())
                .unwrap();

            let node = store.node_by_id(&target.id).unwrap();
            assert_eq!(node.string_property(props::STATE), Some("draft"));
            assert_eq!(node.string_property("myapp:title"), Some("Hello"));
        }

        #[test]
        fn metadata_never_bound() {
            let (mut store, target) = store_with_target();
            let record = ContentNode::new("target", "myapp:article")
                .with_property(ContentProperty::string("jcr:path", "/elsewhere"));

            DefaultFieldBinder
                .bind(&mut store, &target.id, &record, &BindingFilter::new())
                .unwrap();

            assert!(store
                .node_by_id(&target.id)
                .unwrap()
                .property("jcr:path")
                .is_none());
        }

        #[test]
        fn conversion_failure_writes_nothing() {
            let (mut store, target) = store_with_target();
            store.clear_mutations();
            let record = ContentNode::new("target", "myapp:article")
                .with_property(ContentProperty::string("myapp:title", "Hello"))
                .with_property(ContentProperty::new("myapp:count", PropertyType::Long, "x"));

            let err = DefaultFieldBinder
                .bind(&mut store, &target.id, &record, &BindingFilter::new())
                .unwrap_err();

            assert!(matches!(err, BindError::Conversion { .. }));
            assert!(store.mutations().is_empty());
            assert!(!store.has_pending_changes());
        }

        #[test]
        fn child_nodes_replaced() {
            let (mut store, target) = store_with_target();
            let body = |text: &str| {
                ContentNode::new("myapp:body", "hippostd:html")
                    .with_property(ContentProperty::string("hippostd:content", text))
            };

            let first = ContentNode::new("target", "myapp:article").with_node(body("one"));
            DefaultFieldBinder
                .bind(&mut store, &target.id, &first, &BindingFilter::new())
                .unwrap();
            let second = ContentNode::new("target", "myapp:article").with_node(body("two"));
            DefaultFieldBinder
                .bind(&mut store, &target.id, &second, &BindingFilter::new())
                .unwrap();

            let children = store.children(&target).unwrap();
            assert_eq!(children.len(), 1);
            assert_eq!(
                children[0].string_property("hippostd:content"),
                Some("two")
            );
        }

        #[test]
        fn excluded_child_nodes_kept() {
            let (mut store, target) = store_with_target();
            store
                .add_node(&target.id, "hippo:translation", "hippo:translation")
                .unwrap();
            let mut filter = BindingFilter::new();
            filter.exclude_node("hippo:*").unwrap();

            let record = ContentNode::new("target", "myapp:article")
                .with_node(ContentNode::new("hippo:translation", "hippo:translation"))
                .with_node(ContentNode::new("myapp:body", "hippostd:html"));
            DefaultFieldBinder
                .bind(&mut store, &target.id, &record, &filter)
                .unwrap();

            let names: Vec<String> = store
                .children(&target)
                .unwrap()
                .into_iter()
                .map(|c| c.name)
                .collect();
            assert_eq!(names, vec!["hippo:translation", "myapp:body"]);
        }

        #[test]
        fn invalid_child_name_rejected_before_writing() {
            let (mut store, target) = store_with_target();
            store.clear_mutations();
            let record = ContentNode::new("target", "myapp:article")
                .with_property(ContentProperty::string("myapp:title", "Hello"))
                .with_node(ContentNode::new("a/b", "nt:unstructured"));

            let err = DefaultFieldBinder
                .bind(&mut store, &target.id, &record, &BindingFilter::new())
                .unwrap_err();
            assert_eq!(err, BindError::InvalidNodeName("a/b".to_string()));
            assert!(store.mutations().is_empty());
        }

        #[test]
        fn mixins_added_once() {
            let (mut store, target) = store_with_target();
            let record = ContentNode::new("target", "myapp:article")
                .with_mixin("mix:referenceable")
                .with_mixin("myapp:taggable");
            DefaultFieldBinder
                .bind(&mut store, &target.id, &record, &BindingFilter::new())
                .unwrap();

            let node = store.node_by_id(&target.id).unwrap();
            assert!(node.has_mixin("myapp:taggable"));
            // seed_folder already made the target referenceable
            let added: Vec<_> = store
                .mutations()
                .iter()
                .filter(|m| matches!(m, crate::store::memory::Mutation::AddMixin { .. }))
                .collect();
            assert_eq!(added.len(), 1);
        }

        #[test]
        fn custom_converter() {
            struct Upper;
            impl ValueConverter for Upper {
                fn convert(&self, property: &ContentProperty) -> Result<PropertyValue, BindError> {
                    Ok(PropertyValue::strings(
                        property.values.iter().map(|v| v.to_uppercase()),
                    ))
                }
            }

            let (mut store, target) = store_with_target();
            let record = ContentNode::new("target", "myapp:article")
                .with_property(ContentProperty::string("myapp:title", "loud"));
            DefaultFieldBinder
                .bind_with(&mut store, &target.id, &record, &BindingFilter::new(), &Upper)
                .unwrap();

            let node = store.node_by_id(&target.id).unwrap();
            assert_eq!(node.property("myapp:title").unwrap().as_strings(), vec!["LOUD"]);
        }
    }
}
