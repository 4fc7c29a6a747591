//! engine::rollback
//!
//! Restoring the session after a failed operation.
//!
//! # Strategies
//!
//! - [`discard_pending`] drops every unsaved change of the session. It is
//!   all a failure needs when the operation only wrote through the session.
//! - [`undo_created`] additionally removes a folder the operation created
//!   through a workflow action. Workflow actions persist on their own, so
//!   discarding pending changes alone would leave such folders behind.
//!
//! # Failure handling
//!
//! Rollback is best effort. A step that fails is logged at `warn` and
//! recorded in the [`RollbackResult`]; it never replaces the error that
//! triggered the rollback, which the caller still returns.

use tracing::{debug, warn};

use crate::core::node::Node;
use crate::store::{ContentStore, StoreError};

/// Result of a rollback attempt.
#[derive(Debug)]
pub struct RollbackResult {
    /// Steps that completed.
    pub rolled_back: Vec<String>,
    /// Steps that failed, with their errors.
    pub failed: Vec<(String, StoreError)>,
    /// Whether every step completed.
    pub complete: bool,
}

impl Default for RollbackResult {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self {
            rolled_back: vec![],
            failed: vec![],
            complete: true,
        }
    }

    /// Record a completed step.
    pub fn record_success(&mut self, step: impl Into<String>) {
        self.rolled_back.push(step.into());
    }

    /// Record a failed step.
    pub fn record_failure(&mut self, step: impl Into<String>, error: StoreError) {
        let step = step.into();
        warn!(step = %step, error = %error, "rollback step failed");
        self.failed.push((step, error));
        self.complete = false;
    }

    /// Check if any step failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        if self.complete {
            format!("Rolled back {} steps successfully", self.rolled_back.len())
        } else {
            format!(
                "Partial rollback: {} succeeded, {} failed",
                self.rolled_back.len(),
                self.failed.len()
            )
        }
    }

    fn absorb(&mut self, other: RollbackResult) {
        self.rolled_back.extend(other.rolled_back);
        if !other.complete {
            self.complete = false;
        }
        self.failed.extend(other.failed);
    }
}

/// Discard all pending changes of the session.
pub fn discard_pending<S: ContentStore + ?Sized>(store: &mut S) -> RollbackResult {
    let mut result = RollbackResult::new();
    match store.refresh(false) {
        Ok(()) => {
            debug!("discarded pending changes");
            result.record_success("discard pending changes");
        }
        Err(err) => result.record_failure("discard pending changes", err),
    }
    result
}

/// Discard pending changes, then remove `created` and persist the removal.
///
/// `created` must be the topmost node the failed operation created; its
/// whole subtree goes with it.
pub fn undo_created<S: ContentStore + ?Sized>(store: &mut S, created: &Node) -> RollbackResult {
    let mut result = discard_pending(store);
    let step = format!("remove '{}'", created.location);

    let removal = store
        .remove_node(&created.id)
        .and_then(|()| store.save());
    match removal {
        Ok(()) => {
            debug!(path = %created.location, "removed node created by failed operation");
            result.record_success(step);
        }
        Err(err) => {
            result.record_failure(step, err);
            result.absorb(discard_pending(store));
        }
    }
    result
}
