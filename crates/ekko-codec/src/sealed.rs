use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CorruptPayload};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// The sealed wire format: `{ iv, data, tag }`.
///
/// `iv` and `tag` are hex, `data` is base64 ciphertext (tag excluded).
/// All three fields are required; a payload missing any of them is
/// corrupt, never a parse panic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub iv: String,
    pub data: String,
    pub tag: String,
}

impl SealedPayload {
    /// Parse a payload from raw stored bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CorruptPayload> {
        serde_json::from_slice(bytes).map_err(|_| CorruptPayload::envelope())
    }

    /// Serialize the payload to the bytes handed to the blob store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Serialization(e.to_string()))
    }

    /// Decode the nonce field.
    pub(crate) fn nonce_bytes(&self) -> Result<[u8; NONCE_LEN], CorruptPayload> {
        let raw = hex::decode(&self.iv).map_err(|_| CorruptPayload::envelope())?;
        raw.try_into().map_err(|_| CorruptPayload::envelope())
    }

    /// Decode the authentication tag field.
    pub(crate) fn tag_bytes(&self) -> Result<[u8; TAG_LEN], CorruptPayload> {
        let raw = hex::decode(&self.tag).map_err(|_| CorruptPayload::envelope())?;
        raw.try_into().map_err(|_| CorruptPayload::envelope())
    }

    /// Decode the ciphertext field.
    pub(crate) fn ciphertext(&self) -> Result<Vec<u8>, CorruptPayload> {
        BASE64
            .decode(&self.data)
            .map_err(|_| CorruptPayload::envelope())
    }
}
