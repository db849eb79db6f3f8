use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backend does not implement this operation at all.
    #[error("Operation not supported by this user directory: {0}")]
    Unsupported(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The directory server could not be reached or answered with an error.
    #[error("Directory backend error: {0}")]
    Backend(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
