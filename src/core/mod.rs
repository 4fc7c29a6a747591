//! core
//!
//! Core domain types and configuration for the lifecycle coordinator.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Location, NodeId, VariantState
//! - [`value`] - Typed property values
//! - [`node`] - Node snapshots and well-known repository names
//! - [`document`] - The draft state machine and document state summary
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid locations and states at compile time
//! - Nothing here talks to a store; node snapshots are plain values
//! - Schemas are strict and self-describing

pub mod config;
pub mod document;
pub mod node;
pub mod types;
pub mod value;
