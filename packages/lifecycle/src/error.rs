use alerta_database::StoreError;

/// Errors surfaced by lifecycle operations.
///
/// Each variant maps to a distinct caller reaction: fix the input, give
/// up, ask someone else, or refresh and retry.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Malformed or out-of-enum input.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// The referenced report does not exist.
    #[error("Report not found: {id}")]
    NotFound {
        /// Requested report id.
        id: String,
    },

    /// A role, sector or status precondition was not met.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Which precondition failed.
        message: String,
    },

    /// A concurrent claim won the race for this report.
    #[error("Report {id} was already taken")]
    Conflict {
        /// Report id.
        id: String,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl LifecycleError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id } => Self::NotFound { id },
            StoreError::ConditionFailed { id, .. } => Self::Conflict { id },
            other => Self::Store(other),
        }
    }
}
