use thiserror::Error;

/// Errors from blob store backends.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The named object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The presented version token is not the object's current one.
    #[error("version conflict on {0}")]
    Conflict(String),

    /// Transport failure or unexpected remote response.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for blob backend operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors from shard store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The shard's version went stale twice in a row; the enclosing
    /// operation must fail.
    #[error("shard {name}: version conflict persisted after retry")]
    Conflict { name: &'static str },

    /// Transport failure to the remote store.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    /// A document failed to seal or serialize.
    #[error("codec error: {0}")]
    Codec(#[from] ekko_codec::CodecError),
}

/// Result alias for shard store operations.
pub type StoreResult<T> = Result<T, StoreError>;
