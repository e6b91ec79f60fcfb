//! Error type shared by the controller, store and action dispatch

use persistence::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    /// Missing/invalid token or insufficient role. Deliberately carries no detail.
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid component: {0}")]
    InvalidComponent(String),

    #[error("Invalid directive: {0}")]
    InvalidDirective(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl From<DbError> for AutomationError {
    fn from(e: DbError) -> Self {
        AutomationError::Store(e.to_string())
    }
}

pub type AutomationResult<T> = Result<T, AutomationError>;
