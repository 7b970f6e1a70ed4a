use ekko_types::{AudioId, ContentId};
use thiserror::Error;

/// Errors surfaced by the coordinator's operations.
///
/// Every failure is a typed result; the core never panics on caller
/// input. Conflicts and transport failures arrive via
/// [`StoreError`](ekko_store::StoreError); corruption never appears here
/// at all (the store heals it).
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required argument is missing or malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The referenced content does not exist.
    #[error("content not found: {0}")]
    NotFound(ContentId),

    /// Audio rows are immutable; the id is already registered.
    #[error("audio already registered: {0}")]
    AudioExists(AudioId),

    /// The configuration failed validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage-layer failure (version conflict after retry, or the remote
    /// store is unreachable).
    #[error(transparent)]
    Store(#[from] ekko_store::StoreError),
}

/// Result alias for coordinator operations.
pub type CoreResult<T> = Result<T, CoreError>;
