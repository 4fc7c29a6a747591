//! engine::gate
//!
//! Hint gating for workflow actions.
//!
//! # Architecture
//!
//! Gating decides whether one action may be invoked, given the hints the
//! repository reported moments earlier. There is no global "document is
//! editable" flag: each action has its own hint key, and only that key is
//! consulted.
//!
//! # Invariants
//!
//! - Only an explicit `true` flag yields [`GateResult::Ready`]
//! - A missing key, a `false` flag and a textual value are all denials
//! - Gating is deterministic given the same hints
//!
//! # Example
//!
//! ```
//! use content_lifecycle::engine::capabilities::Action;
//! use content_lifecycle::engine::gate::{gate, GateResult};
//! use content_lifecycle::store::workflow::Hints;
//!
//! let hints = Hints::new().with_flag("publish", true);
//! assert_eq!(gate(&hints, Action::Publish), GateResult::Ready);
//! assert!(!gate(&hints, Action::Delete).is_ready());
//! ```

use super::capabilities::Action;
use crate::store::workflow::{HintValue, Hints};

/// Outcome of gating one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateResult {
    /// The action is available.
    Ready,
    /// The action is not available.
    Denied {
        /// The gated action.
        action: Action,
        /// What the hints reported for it, if anything.
        reported: Option<HintValue>,
    },
}

impl GateResult {
    /// Whether the action may be invoked.
    pub fn is_ready(&self) -> bool {
        matches!(self, GateResult::Ready)
    }
}

/// Gate `action` against `hints`.
pub fn gate(hints: &Hints, action: Action) -> GateResult {
    if hints.is_true(action.hint_key()) {
        return GateResult::Ready;
    }
    GateResult::Denied {
        action,
        reported: hints.get(action.hint_key()).cloned(),
    }
}
