//! binding
//!
//! The field binder: source records, exclusion filters, and the binder
//! that writes one onto a node.
//!
//! # Modules
//!
//! - [`record`] - `ContentNode`/`ContentProperty` source records
//! - [`filter`] - `BindingFilter` exclusion patterns
//! - [`binder`] - `FieldBinder` and value conversion

pub mod binder;
pub mod filter;
pub mod record;

pub use binder::{BindError, DefaultFieldBinder, DefaultValueConverter, FieldBinder, ValueConverter};
pub use filter::{BindingFilter, ExcludePattern, PatternError};
pub use record::{ContentNode, ContentProperty};
