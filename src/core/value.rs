//! core::value
//!
//! Typed property values stored on repository nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    String,
    Boolean,
    Long,
    Double,
    Date,
    Binary,
}

impl PropertyType {
    /// Type name as used in source records.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "STRING",
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Long => "LONG",
            PropertyType::Double => "DOUBLE",
            PropertyType::Date => "DATE",
            PropertyType::Binary => "BINARY",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
}

impl Value {
    /// The type of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::String(_) => PropertyType::String,
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Long(_) => PropertyType::Long,
            Value::Double(_) => PropertyType::Double,
            Value::Date(_) => PropertyType::Date,
            Value::Binary(_) => PropertyType::Binary,
        }
    }

    /// The string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

/// A property value: either single or multi-valued.
///
/// # Example
///
/// ```
/// use content_lifecycle::core::value::PropertyValue;
///
/// let title = PropertyValue::string("Hello");
/// assert_eq!(title.as_str(), Some("Hello"));
///
/// let availability = PropertyValue::strings(["live", "preview"]);
/// assert_eq!(availability.as_strings(), vec!["live", "preview"]);
/// assert!(availability.contains_str("live"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Single(Value),
    Multiple(Vec<Value>),
}

impl PropertyValue {
    /// Single string value.
    pub fn string(s: impl Into<String>) -> Self {
        PropertyValue::Single(Value::String(s.into()))
    }

    /// Multi-valued string property.
    pub fn strings<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyValue::Multiple(
            values
                .into_iter()
                .map(|s| Value::String(s.into()))
                .collect(),
        )
    }

    /// Whether this property is multi-valued.
    pub fn is_multiple(&self) -> bool {
        matches!(self, PropertyValue::Multiple(_))
    }

    /// The single value, if not multi-valued.
    pub fn single(&self) -> Option<&Value> {
        match self {
            PropertyValue::Single(v) => Some(v),
            PropertyValue::Multiple(_) => None,
        }
    }

    /// All values (one for single-valued properties).
    pub fn values(&self) -> &[Value] {
        match self {
            PropertyValue::Single(v) => std::slice::from_ref(v),
            PropertyValue::Multiple(vs) => vs,
        }
    }

    /// The single string content, if this is a single string value.
    pub fn as_str(&self) -> Option<&str> {
        self.single().and_then(Value::as_str)
    }

    /// Every string value, skipping values of other types.
    pub fn as_strings(&self) -> Vec<&str> {
        self.values().iter().filter_map(Value::as_str).collect()
    }

    /// Whether any value is the string `needle`.
    pub fn contains_str(&self, needle: &str) -> bool {
        self.values().iter().any(|v| v.as_str() == Some(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_accessors() {
        let value = PropertyValue::Single(Value::Long(42));
        assert!(!value.is_multiple());
        assert_eq!(value.single(), Some(&Value::Long(42)));
        assert_eq!(value.values().len(), 1);
        assert_eq!(value.as_str(), None);
    }

    #[test]
    fn multiple_value_accessors() {
        let value = PropertyValue::strings(["a", "b"]);
        assert!(value.is_multiple());
        assert!(value.single().is_none());
        assert_eq!(value.as_strings(), vec!["a", "b"]);
        assert!(!value.contains_str("c"));
    }

    #[test]
    fn empty_multiple_has_no_values() {
        let value = PropertyValue::Multiple(vec![]);
        assert!(value.values().is_empty());
        assert!(!value.contains_str("live"));
    }

    #[test]
    fn value_types() {
        assert_eq!(Value::from("x").property_type(), PropertyType::String);
        assert_eq!(Value::from(true).property_type(), PropertyType::Boolean);
        assert_eq!(Value::Binary(vec![1]).property_type(), PropertyType::Binary);
    }

    #[test]
    fn property_type_serde_uses_uppercase() {
        let json = serde_json::to_string(&PropertyType::Date).unwrap();
        assert_eq!(json, "\"DATE\"");
        let parsed: PropertyType = serde_json::from_str("\"BINARY\"").unwrap();
        assert_eq!(parsed, PropertyType::Binary);
    }
}
