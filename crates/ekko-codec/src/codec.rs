use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CorruptPayload};
use crate::key::EncryptionKey;
use crate::sealed::{SealedPayload, NONCE_LEN, TAG_LEN};

/// Seals and opens shard documents with AES-256-GCM.
///
/// One codec instance is built per process from the configured key and
/// shared by every shard. `seal` draws a fresh random nonce on each call;
/// `open` verifies the authentication tag before any plaintext is parsed.
pub struct DocumentCodec {
    cipher: Aes256Gcm,
}

impl DocumentCodec {
    pub fn new(key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Self { cipher }
    }

    /// Encrypt a document into the sealed wire format.
    pub fn seal<T: Serialize>(&self, document: &T) -> Result<SealedPayload, CodecError> {
        let plaintext =
            serde_json::to_vec(document).map_err(|e| CodecError::Serialization(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let mut ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| CodecError::Encrypt)?;

        // The aead API appends the tag to the ciphertext; the wire format
        // carries it as its own field.
        let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);

        Ok(SealedPayload {
            iv: hex::encode(nonce),
            data: BASE64.encode(&ciphertext),
            tag: hex::encode(tag),
        })
    }

    /// Decrypt and parse a sealed payload.
    ///
    /// Any failure (undecodable field, tag mismatch, malformed plaintext)
    /// is reported as [`CorruptPayload`]. This function does not panic on
    /// any input.
    pub fn open<T: DeserializeOwned>(&self, payload: &SealedPayload) -> Result<T, CorruptPayload> {
        let nonce = payload.nonce_bytes()?;
        let tag = payload.tag_bytes()?;
        let mut buf = payload.ciphertext()?;
        buf.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), buf.as_slice())
            .map_err(|_| CorruptPayload::authentication())?;

        serde_json::from_slice(&plaintext).map_err(|_| CorruptPayload::document())
    }
}

impl std::fmt::Debug for DocumentCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCodec").finish_non_exhaustive()
    }
}
