use thiserror::Error;

/// Errors from sealing and key handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The configured key is not 64 hex characters (256 bits).
    #[error("encryption key must be 64 hex characters")]
    InvalidKey,

    /// The document could not be serialized for sealing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The cipher rejected the encryption request.
    #[error("encryption failed")]
    Encrypt,
}

/// Signal that a sealed payload cannot be opened.
///
/// Corrupt or tampered shards are healed by the store, not propagated;
/// the reason string exists for logging only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sealed payload is corrupt: {reason}")]
pub struct CorruptPayload {
    pub reason: &'static str,
}

impl CorruptPayload {
    /// The outer JSON envelope is missing or malformed.
    pub fn envelope() -> Self {
        Self {
            reason: "missing or malformed envelope field",
        }
    }

    /// The authentication tag failed to verify.
    pub fn authentication() -> Self {
        Self {
            reason: "authentication failed",
        }
    }

    /// Decryption succeeded but the plaintext is not a well-formed document.
    pub fn document() -> Self {
        Self {
            reason: "plaintext is not a well-formed document",
        }
    }
}
