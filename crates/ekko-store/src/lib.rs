//! Versioned blob storage for the ekko service.
//!
//! All durable state lives in a handful of named, encrypted JSON documents
//! ("shards") kept in a remote version-controlled object store. The remote
//! store offers only single-object compare-and-swap: every fetch returns a
//! version token, and a write is accepted only when the caller presents the
//! object's current token.
//!
//! # Layers
//!
//! - [`BlobStore`] — the adapter trait over the remote store, with the
//!   [`GitHubBlobStore`] production backend and the [`InMemoryBlobStore`]
//!   test backend
//! - [`ShardCache`] — short-TTL cache of decrypted documents per shard name
//! - [`ShardStore`] — composes codec, blobs, and cache into typed
//!   [`ShardStore::load`]/[`ShardStore::save`] operations
//!
//! # Design Rules
//!
//! 1. No write is ever issued with a cached token without a fresh reload
//!    first: a stale-token conflict triggers exactly one reload-and-retry,
//!    then fails the operation.
//! 2. A corrupt or missing remote shard is replaced with the schema's
//!    empty default and the replacement is persisted immediately
//!    (self-heal); corruption never propagates to callers.
//! 3. The cache never serves an entry past its TTL or past this process's
//!    own successful write of the shard.

pub mod cache;
pub mod error;
pub mod github;
pub mod memory;
pub mod shard;
pub mod traits;

pub use cache::{ShardCache, DEFAULT_TTL};
pub use error::{BlobError, BlobResult, StoreError, StoreResult};
pub use github::{GitHubBlobStore, GitHubConfig};
pub use memory::InMemoryBlobStore;
pub use shard::{Loaded, ShardStore};
pub use traits::{BlobStore, RawBlob};
