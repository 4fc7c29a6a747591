//! core::document
//!
//! The editing state machine of a document handle.
//!
//! # Model
//!
//! One stable handle owns up to three variants, each tagged with a
//! [`VariantState`]. Editing is mutually exclusive: at most one draft is
//! open at a time, and it is held by exactly one actor.
//!
//! ```text
//!             obtain(actor)
//!   NoDraft ----------------> DraftOpen { holder }
//!      ^                            |
//!      |     dispose / commit       |
//!      +----------------------------+
//! ```
//!
//! The state is derived from the variants rather than from node types, so
//! a store that keeps a released draft node around (with no holder) still
//! reads as `NoDraft`.
//!
//! # Example
//!
//! ```
//! use content_lifecycle::core::document::DraftState;
//!
//! let state = DraftState::NoDraft;
//! let open = state.obtain("editor").unwrap();
//! assert!(open.is_held_by("editor"));
//!
//! // A second obtain fails while the draft is open.
//! assert!(open.obtain("editor").is_err());
//!
//! let closed = open.commit("editor").unwrap();
//! assert_eq!(closed, DraftState::NoDraft);
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use super::node::{availability, Node};
use super::types::VariantState;

/// Variants of one handle, keyed by state.
pub type VariantMap = BTreeMap<VariantState, Node>;

/// Errors from illegal draft transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("document is already being edited by '{holder}'")]
    AlreadyEditing { holder: String },

    #[error("no draft is open")]
    NoDraft,

    #[error("draft is held by '{holder}', not '{actor}'")]
    HeldByOther { holder: String, actor: String },
}

/// Whether a handle currently has an open draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftState {
    /// Nobody is editing the document.
    NoDraft,
    /// A draft is open and held for exclusive editing.
    DraftOpen { holder: String },
}

impl DraftState {
    /// Derive the draft state from a handle's variants.
    pub fn from_variants(variants: &VariantMap) -> Self {
        variants
            .get(&VariantState::Draft)
            .and_then(|draft| draft.holder())
            .map(|holder| DraftState::DraftOpen {
                holder: holder.to_string(),
            })
            .unwrap_or(DraftState::NoDraft)
    }

    /// Whether a draft is open.
    pub fn is_open(&self) -> bool {
        matches!(self, DraftState::DraftOpen { .. })
    }

    /// The holder of the open draft.
    pub fn holder(&self) -> Option<&str> {
        match self {
            DraftState::NoDraft => None,
            DraftState::DraftOpen { holder } => Some(holder),
        }
    }

    /// Whether `actor` holds the open draft.
    pub fn is_held_by(&self, actor: &str) -> bool {
        self.holder() == Some(actor)
    }

    /// Open a draft for `actor`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::AlreadyEditing` if a draft is already open,
    /// whoever holds it.
    pub fn obtain(&self, actor: &str) -> Result<DraftState, TransitionError> {
        match self {
            DraftState::NoDraft => Ok(DraftState::DraftOpen {
                holder: actor.to_string(),
            }),
            DraftState::DraftOpen { holder } => Err(TransitionError::AlreadyEditing {
                holder: holder.clone(),
            }),
        }
    }

    /// Discard the draft held by `actor`.
    pub fn dispose(&self, actor: &str) -> Result<DraftState, TransitionError> {
        self.release(actor)
    }

    /// Commit the draft held by `actor`.
    pub fn commit(&self, actor: &str) -> Result<DraftState, TransitionError> {
        self.release(actor)
    }

    fn release(&self, actor: &str) -> Result<DraftState, TransitionError> {
        match self {
            DraftState::NoDraft => Err(TransitionError::NoDraft),
            DraftState::DraftOpen { holder } if holder != actor => {
                Err(TransitionError::HeldByOther {
                    holder: holder.clone(),
                    actor: actor.to_string(),
                })
            }
            DraftState::DraftOpen { .. } => Ok(DraftState::NoDraft),
        }
    }
}

/// Summary of a handle's variants, used to decide which actions apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    /// Editing state.
    pub draft: DraftState,
    /// An unpublished variant exists.
    pub has_unpublished: bool,
    /// A published variant exists.
    pub has_published: bool,
    /// The published variant is available on the live site.
    pub live: bool,
}

impl DocumentState {
    /// Derive the state from a handle's variants.
    pub fn from_variants(variants: &VariantMap) -> Self {
        let published = variants.get(&VariantState::Published);
        Self {
            draft: DraftState::from_variants(variants),
            has_unpublished: variants.contains_key(&VariantState::Unpublished),
            has_published: published.is_some(),
            live: published
                .map(|p| p.is_available_in(availability::LIVE))
                .unwrap_or(false),
        }
    }

    /// Whether the document has committed content to work from.
    pub fn has_content(&self) -> bool {
        self.has_unpublished || self.has_published
    }

    /// Editing may start.
    pub fn can_obtain(&self) -> bool {
        !self.draft.is_open() && self.has_content()
    }

    /// The draft may be disposed or committed by `actor`.
    pub fn can_release(&self, actor: &str) -> bool {
        self.draft.is_held_by(actor)
    }

    /// The unpublished content may be published.
    pub fn can_publish(&self) -> bool {
        !self.draft.is_open() && self.has_unpublished
    }

    /// The live content may be taken offline.
    pub fn can_depublish(&self) -> bool {
        self.live && !self.draft.is_open()
    }

    /// The document may be removed.
    pub fn can_delete(&self) -> bool {
        !self.live && !self.draft.is_open()
    }
}

/// The variant a translation should be made from: unpublished if present,
/// else published.
pub fn translation_source(variants: &VariantMap) -> Option<&Node> {
    variants
        .get(&VariantState::Unpublished)
        .or_else(|| variants.get(&VariantState::Published))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::core::node::props;
    use crate::core::types::{Location, NodeId};
    use crate::core::value::PropertyValue;

    fn variant(state: VariantState) -> Node {
        let mut properties = BTreeMap::new();
        properties.insert(
            props::STATE.to_string(),
            PropertyValue::string(state.as_str()),
        );
        Node {
            id: NodeId::new(),
            name: "doc".to_string(),
            location: Location::new("/content/doc/doc").unwrap(),
            primary_type: "myapp:article".to_string(),
            mixins: BTreeSet::new(),
            properties,
        }
    }

    fn held_draft(holder: &str) -> Node {
        let mut draft = variant(VariantState::Draft);
        draft
            .properties
            .insert(props::HOLDER.to_string(), PropertyValue::string(holder));
        draft
    }

    fn live(mut published: Node) -> Node {
        published.properties.insert(
            props::AVAILABILITY.to_string(),
            PropertyValue::strings([availability::LIVE]),
        );
        published
    }

    mod draft_state {
        use super::*;

        #[test]
        fn obtain_from_no_draft() {
            let open = DraftState::NoDraft.obtain("alice").unwrap();
            assert_eq!(
                open,
                DraftState::DraftOpen {
                    holder: "alice".to_string()
                }
            );
        }

        #[test]
        fn obtain_while_open_fails_for_anyone() {
            let open = DraftState::NoDraft.obtain("alice").unwrap();
            assert_eq!(
                open.obtain("alice"),
                Err(TransitionError::AlreadyEditing {
                    holder: "alice".to_string()
                })
            );
            assert!(open.obtain("bob").is_err());
        }

        #[test]
        fn dispose_and_commit_release() {
            let open = DraftState::NoDraft.obtain("alice").unwrap();
            assert_eq!(open.dispose("alice"), Ok(DraftState::NoDraft));
            assert_eq!(open.commit("alice"), Ok(DraftState::NoDraft));
        }

        #[test]
        fn release_without_draft_fails() {
            assert_eq!(DraftState::NoDraft.commit("alice"), Err(TransitionError::NoDraft));
            assert_eq!(DraftState::NoDraft.dispose("alice"), Err(TransitionError::NoDraft));
        }

        #[test]
        fn release_by_other_actor_fails() {
            let open = DraftState::NoDraft.obtain("alice").unwrap();
            assert!(matches!(
                open.commit("bob"),
                Err(TransitionError::HeldByOther { .. })
            ));
        }

        #[test]
        fn from_variants_requires_holder() {
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Draft, variant(VariantState::Draft));
            assert_eq!(DraftState::from_variants(&variants), DraftState::NoDraft);

            variants.insert(VariantState::Draft, held_draft("alice"));
            assert!(DraftState::from_variants(&variants).is_held_by("alice"));
        }
    }

    mod document_state {
        use super::*;

        #[test]
        fn new_document() {
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Unpublished, variant(VariantState::Unpublished));
            let state = DocumentState::from_variants(&variants);

            assert!(state.can_obtain());
            assert!(state.can_publish());
            assert!(!state.can_depublish());
            assert!(state.can_delete());
            assert!(!state.can_release("alice"));
        }

        #[test]
        fn open_draft_blocks_everything_but_release() {
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Unpublished, variant(VariantState::Unpublished));
            variants.insert(VariantState::Draft, held_draft("alice"));
            let state = DocumentState::from_variants(&variants);

            assert!(!state.can_obtain());
            assert!(!state.can_publish());
            assert!(!state.can_delete());
            assert!(state.can_release("alice"));
            assert!(!state.can_release("bob"));
        }

        #[test]
        fn live_document() {
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Unpublished, variant(VariantState::Unpublished));
            variants.insert(VariantState::Published, live(variant(VariantState::Published)));
            let state = DocumentState::from_variants(&variants);

            assert!(state.live);
            assert!(state.can_depublish());
            assert!(!state.can_delete());
        }

        #[test]
        fn offline_published_is_not_live() {
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Published, variant(VariantState::Published));
            let state = DocumentState::from_variants(&variants);

            assert!(state.has_content());
            assert!(!state.live);
            assert!(!state.can_publish());
        }

        #[test]
        fn empty_handle_has_no_content() {
            let state = DocumentState::from_variants(&VariantMap::new());
            assert!(!state.has_content());
            assert!(!state.can_obtain());
        }
    }

    mod translation {
        use super::*;

        #[test]
        fn prefers_unpublished() {
            let unpublished = variant(VariantState::Unpublished);
            let expected = unpublished.id;
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Published, variant(VariantState::Published));
            variants.insert(VariantState::Unpublished, unpublished);

            assert_eq!(translation_source(&variants).map(|n| n.id), Some(expected));
        }

        #[test]
        fn falls_back_to_published() {
            let published = variant(VariantState::Published);
            let expected = published.id;
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Published, published);

            assert_eq!(translation_source(&variants).map(|n| n.id), Some(expected));
        }

        #[test]
        fn draft_only_has_no_source() {
            let mut variants = VariantMap::new();
            variants.insert(VariantState::Draft, held_draft("alice"));
            assert!(translation_source(&variants).is_none());
        }
    }
}
