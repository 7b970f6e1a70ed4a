use std::fmt;

use zeroize::Zeroize;

use crate::error::CodecError;

/// A 256-bit AES key, parsed from the 64-hex-character secret provided by
/// configuration.
///
/// The raw material is zeroized on drop and never appears in `Debug`
/// output. There is intentionally no `Display`, `Serialize`, or accessor
/// returning an owned copy.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Parse a key from its hex form. Anything but exactly 64 hex
    /// characters is rejected.
    pub fn from_hex(hex_str: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_str).map_err(|_| CodecError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CodecError::InvalidKey)?;
        Ok(Self(arr))
    }

    /// Build a key from raw bytes (tests, key rotation tooling).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key material for cipher construction.
    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey(..)")
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
