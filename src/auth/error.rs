use crate::{directory::DirectoryError, store::StoreError};

/// Failure inside a single authentication strategy.
///
/// These never reach the client: the provider chain treats every variant as
/// "this strategy abstains" and moves on to the next one.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credential header present but unparseable.
    #[error("malformed credentials: {0}")]
    Malformed(String),

    /// Credentials parsed but were rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// OAuth request signed with a key that is not configured.
    #[error("unknown oauth consumer key: {0}")]
    UnknownConsumerKey(String),

    #[error("unsupported oauth signature method: {0}")]
    UnsupportedSignatureMethod(String),

    #[error("oauth signature mismatch")]
    InvalidSignature,

    /// OAuth timestamp outside the allowed clock skew window.
    #[error("oauth timestamp {timestamp} outside allowed skew of {max_skew_secs}s")]
    StaleTimestamp { timestamp: i64, max_skew_secs: u64 },

    /// Delegated identity header sent by a peer that is not a trusted proxy.
    #[error("untrusted source for header {0}")]
    UntrustedSource(String),

    #[error("user directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether the failure came from a collaborator rather than the request.
    pub fn is_backend(&self) -> bool {
        matches!(self, AuthError::Directory(_) | AuthError::Store(_))
    }
}
