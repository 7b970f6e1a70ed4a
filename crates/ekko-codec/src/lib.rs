//! Authenticated document encryption for the ekko storage layer.
//!
//! Every shard document is persisted as a *sealed payload*: the document's
//! JSON bytes encrypted with AES-256-GCM under a fresh random 96-bit nonce,
//! with the authentication tag carried alongside the ciphertext. The wire
//! format is the three-field JSON object the service has always written:
//!
//! ```json
//! { "iv": "<hex, 12 bytes>", "data": "<base64 ciphertext>", "tag": "<hex, 16 bytes>" }
//! ```
//!
//! # Design Rules
//!
//! 1. A fresh nonce is generated for every seal; nonce reuse under one key
//!    is forbidden.
//! 2. [`DocumentCodec::open`] never panics: a missing field, a failed tag,
//!    or malformed plaintext all surface as the [`CorruptPayload`] signal.
//! 3. Key material is never logged, displayed, or serialized, and is
//!    zeroized on drop.
//! 4. Round-trip law: `open(seal(d)) == d` for every valid document `d`.

pub mod codec;
pub mod error;
pub mod key;
pub mod sealed;

pub use codec::DocumentCodec;
pub use error::{CodecError, CorruptPayload};
pub use key::EncryptionKey;
pub use sealed::SealedPayload;
