use std::io;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum NavigatorError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("A search is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Malformed field `{field}`: {reason}")]
    Malformed { field: &'static str, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, NavigatorError>;

/// Maps an IO failure on `path` to the navigation error kinds callers match on.
pub fn classify_io_error(path: &Path, error: io::Error) -> NavigatorError {
    match error.kind() {
        io::ErrorKind::NotFound => NavigatorError::NotFound(path.display().to_string()),
        io::ErrorKind::PermissionDenied => {
            NavigatorError::AccessDenied(path.display().to_string())
        }
        _ => NavigatorError::Io(error),
    }
}

pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> NavigatorError {
    NavigatorError::Malformed {
        field,
        reason: reason.into(),
    }
}
