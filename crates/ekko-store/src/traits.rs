use async_trait::async_trait;
use ekko_types::VersionToken;

use crate::error::BlobResult;

/// A fetched object: its raw sealed bytes plus the version token that must
/// guard the next write of the same name.
#[derive(Clone, Debug)]
pub struct RawBlob {
    pub bytes: Vec<u8>,
    pub version: VersionToken,
}

/// Adapter over the remote version-controlled object store.
///
/// The store holds opaque byte objects under flat names and enforces
/// single-object compare-and-swap:
///
/// - `fetch` returns the current bytes and version token, or
///   [`BlobError::NotFound`](crate::BlobError::NotFound).
/// - `put` with `base: None` creates the object; with `base: Some(v)` it
///   replaces the object only if `v` is still current, failing with
///   [`BlobError::Conflict`](crate::BlobError::Conflict) otherwise.
///
/// There is no multi-object operation; cross-shard consistency is built
/// above this trait, never inside it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a named object.
    async fn fetch(&self, name: &str) -> BlobResult<RawBlob>;

    /// Write a named object, conditioned on `base`. Returns the new
    /// version token. `message` describes the change for stores that keep
    /// history.
    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        base: Option<&VersionToken>,
        message: &str,
    ) -> BlobResult<VersionToken>;
}
