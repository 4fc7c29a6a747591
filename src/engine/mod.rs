//! engine
//!
//! Coordinates workflow-gated lifecycle operations: Resolve -> Gate -> Invoke.
//!
//! # Architecture
//!
//! The engine is the only layer that drives workflows. It enforces the same
//! protocol for every operation:
//!
//! 1. **Resolve**: turn the caller's location into a node and its handle
//! 2. **Gate**: fetch the workflow's hints and check the requested action
//! 3. **Invoke**: perform the action, or fail with a typed error
//!
//! ```text
//! Resolve -> Gate -> Invoke -> [Rollback on failure]
//! ```
//!
//! # Invariants
//!
//! - No workflow action is invoked without a fresh hint check
//! - Invalid input is rejected before any workflow is contacted
//! - Every error carries its operation and location
//! - A failed rollback never hides the error that caused it
//!
//! # Modules
//!
//! - [`manager`] - `DocumentManager`, the document lifecycle coordinator
//! - [`binary`] - `BinaryImporter`, gallery folders and binary handles
//! - [`capabilities`] - actions and the capability resolver
//! - [`gate`] - gating an action against hints
//! - [`rollback`] - restoring the session after a failure
//! - [`error`] - the coordinator error taxonomy

pub mod binary;
pub mod capabilities;
pub mod error;
pub mod gate;
pub mod manager;
pub mod rollback;

// Re-exports for convenience
pub use binary::BinaryImporter;
pub use capabilities::{Action, CapabilityResolver, Resolved};
pub use error::{ErrorKind, FailureCause, ManagerError, Operation, StateViolation};
pub use gate::{gate, GateResult};
pub use manager::DocumentManager;
pub use rollback::{discard_pending, undo_created, RollbackResult};
