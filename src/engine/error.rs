//! engine::error
//!
//! The single error type raised by the coordinators.
//!
//! # Taxonomy
//!
//! | Kind | Meaning | Rollback |
//! |------|---------|----------|
//! | [`ErrorKind::InvalidArgument`] | bad or missing location, target or input | no |
//! | [`ErrorKind::IllegalState`] | the action is not currently available | no |
//! | [`ErrorKind::Failure`] | the store, a workflow or the binder failed | yes |
//!
//! Every error carries the [`Operation`] and the location it was raised
//! for. Failures keep the underlying error as their `source()`, so the full
//! causal chain is available without being flattened into the message.
//!
//! None of the kinds is retried by the coordinators.

use thiserror::Error;

use super::capabilities::Action;
use crate::binding::BindError;
use crate::store::StoreError;

/// The coordinator operation an error was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDocument,
    ObtainEditableDocument,
    UpdateEditableDocument,
    DisposeEditableDocument,
    CommitEditableDocument,
    PublishDocument,
    DepublishDocument,
    DeleteDocument,
    CopyDocument,
    TranslateFolder,
    TranslateDocument,
    CreateBinaryFolder,
    ImportBinary,
}

impl Operation {
    /// Stable name used in messages and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateDocument => "create-document",
            Operation::ObtainEditableDocument => "obtain-editable-document",
            Operation::UpdateEditableDocument => "update-editable-document",
            Operation::DisposeEditableDocument => "dispose-editable-document",
            Operation::CommitEditableDocument => "commit-editable-document",
            Operation::PublishDocument => "publish-document",
            Operation::DepublishDocument => "depublish-document",
            Operation::DeleteDocument => "delete-document",
            Operation::CopyDocument => "copy-document",
            Operation::TranslateFolder => "translate-folder",
            Operation::TranslateDocument => "translate-document",
            Operation::CreateBinaryFolder => "create-binary-folder",
            Operation::ImportBinary => "import-binary",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an operation was refused in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateViolation {
    #[error("action '{}' is not available", .0.hint_key())]
    ActionUnavailable(Action),

    #[error("no unpublished or published variant to translate")]
    NoTranslatableVariant,
}

/// The underlying error of a failure.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("repository operation failed")]
    Store(#[source] StoreError),

    #[error("binding the source record failed")]
    Bind(#[source] BindError),
}

impl From<StoreError> for FailureCause {
    fn from(err: StoreError) -> Self {
        FailureCause::Store(err)
    }
}

impl From<BindError> for FailureCause {
    fn from(err: BindError) -> Self {
        match err {
            BindError::Store(store) => FailureCause::Store(store),
            other => FailureCause::Bind(other),
        }
    }
}

/// Coarse classification of a [`ManagerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    IllegalState,
    Failure,
}

/// Errors from coordinator operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{operation} '{location}': {reason}")]
    InvalidArgument {
        operation: Operation,
        location: String,
        reason: String,
    },

    #[error("{operation} '{location}': {violation}")]
    IllegalState {
        operation: Operation,
        location: String,
        violation: StateViolation,
    },

    #[error("{operation} '{location}' failed")]
    Failure {
        operation: Operation,
        location: String,
        #[source]
        cause: FailureCause,
    },
}

impl ManagerError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagerError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            ManagerError::IllegalState { .. } => ErrorKind::IllegalState,
            ManagerError::Failure { .. } => ErrorKind::Failure,
        }
    }

    /// The operation that raised this error.
    pub fn operation(&self) -> Operation {
        match self {
            ManagerError::InvalidArgument { operation, .. }
            | ManagerError::IllegalState { operation, .. }
            | ManagerError::Failure { operation, .. } => *operation,
        }
    }

    /// The location the operation was called for.
    pub fn location(&self) -> &str {
        match self {
            ManagerError::InvalidArgument { location, .. }
            | ManagerError::IllegalState { location, .. }
            | ManagerError::Failure { location, .. } => location,
        }
    }

    /// The state violation, for `IllegalState` errors.
    pub fn violation(&self) -> Option<&StateViolation> {
        match self {
            ManagerError::IllegalState { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

/// Operation and location an error is reported against.
#[derive(Debug, Clone)]
pub(crate) struct ErrorContext {
    pub(crate) operation: Operation,
    pub(crate) location: String,
}

impl ErrorContext {
    pub(crate) fn new(operation: Operation, location: impl Into<String>) -> Self {
        Self {
            operation,
            location: location.into(),
        }
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> ManagerError {
        ManagerError::InvalidArgument {
            operation: self.operation,
            location: self.location.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn illegal(&self, violation: StateViolation) -> ManagerError {
        ManagerError::IllegalState {
            operation: self.operation,
            location: self.location.clone(),
            violation,
        }
    }

    pub(crate) fn failure(&self, cause: impl Into<FailureCause>) -> ManagerError {
        ManagerError::Failure {
            operation: self.operation,
            location: self.location.clone(),
            cause: cause.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    fn cx() -> ErrorContext {
        ErrorContext::new(Operation::PublishDocument, "/content/documents/news")
    }

    #[test]
    fn kinds() {
        assert_eq!(cx().invalid("missing").kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            cx().illegal(StateViolation::ActionUnavailable(Action::Publish))
                .kind(),
            ErrorKind::IllegalState
        );
        assert_eq!(
            cx().failure(StoreError::Injected("save".into())).kind(),
            ErrorKind::Failure
        );
    }

    #[test]
    fn context_is_carried() {
        let err = cx().invalid("document does not exist");
        assert_eq!(err.operation(), Operation::PublishDocument);
        assert_eq!(err.location(), "/content/documents/news");
        assert_eq!(
            err.to_string(),
            "publish-document '/content/documents/news': document does not exist"
        );
    }

    #[test]
    fn failure_keeps_causal_chain() {
        let err = cx().failure(StoreError::Injected("save".into()));

        // The message does not embed the cause...
        assert!(!err.to_string().contains("injected"));

        // ...but the chain reaches it.
        let cause = err.source().unwrap();
        let root = cause.source().unwrap();
        assert_eq!(root.to_string(), "injected failure: save");
    }

    #[test]
    fn bind_store_errors_flatten_to_store_cause() {
        let cause = FailureCause::from(BindError::Store(StoreError::NotFound("/x".into())));
        assert!(matches!(cause, FailureCause::Store(StoreError::NotFound(_))));

        let cause = FailureCause::from(BindError::InvalidNodeName("a/b".into()));
        assert!(matches!(cause, FailureCause::Bind(_)));
    }

    #[test]
    fn violation_message_names_hint() {
        let violation = StateViolation::ActionUnavailable(Action::ObtainEditableInstance);
        assert_eq!(
            violation.to_string(),
            "action 'obtainEditableInstance' is not available"
        );
    }
}
