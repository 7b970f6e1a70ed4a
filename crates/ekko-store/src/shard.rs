use std::sync::Arc;
use std::time::Duration;

use ekko_codec::{DocumentCodec, SealedPayload};
use ekko_types::{ShardDocument, VersionToken};
use tracing::{debug, warn};

use crate::cache::ShardCache;
use crate::error::{BlobError, StoreError, StoreResult};
use crate::traits::BlobStore;

/// A loaded shard: the decrypted document plus the version token that must
/// guard its next save.
#[derive(Clone, Debug)]
pub struct Loaded<D> {
    pub doc: D,
    pub version: VersionToken,
}

/// Typed load/save access to the encrypted shards.
///
/// Composes the blob store adapter, the document codec, and the TTL cache.
/// `load` serves from cache when fresh; `save` writes through with the
/// caller's version token and retries a stale token exactly once after a
/// fresh reload. Corrupt or missing remote copies are replaced with the
/// schema's empty default and persisted immediately.
pub struct ShardStore {
    blobs: Arc<dyn BlobStore>,
    codec: DocumentCodec,
    cache: ShardCache,
}

impl ShardStore {
    pub fn new(blobs: Arc<dyn BlobStore>, codec: DocumentCodec, cache_ttl: Duration) -> Self {
        Self {
            blobs,
            codec,
            cache: ShardCache::new(cache_ttl),
        }
    }

    /// Load a shard, serving from cache when the entry is under TTL.
    pub async fn load<D: ShardDocument>(&self) -> StoreResult<Loaded<D>> {
        if let Some((doc, version)) = self.cache.get::<D>() {
            debug!(shard = D::NAME, "cache hit");
            return Ok(Loaded { doc, version });
        }
        self.load_uncached().await
    }

    /// Load a shard from the remote store, bypassing the cache. The result
    /// still replaces the cache entry.
    async fn load_uncached<D: ShardDocument>(&self) -> StoreResult<Loaded<D>> {
        match self.blobs.fetch(D::NAME).await {
            Ok(raw) => {
                let opened = SealedPayload::from_bytes(&raw.bytes)
                    .and_then(|payload| self.codec.open::<D>(&payload));
                match opened {
                    Ok(doc) => {
                        self.cache.put(&doc, &raw.version);
                        Ok(Loaded {
                            doc,
                            version: raw.version,
                        })
                    }
                    Err(corrupt) => {
                        warn!(
                            shard = D::NAME,
                            reason = corrupt.reason,
                            "corrupt shard, replacing with empty default"
                        );
                        self.heal::<D>(Some(&raw.version)).await
                    }
                }
            }
            Err(BlobError::NotFound(_)) => {
                debug!(shard = D::NAME, "shard absent, creating empty default");
                self.heal::<D>(None).await
            }
            Err(e) => Err(Self::blob_failure::<D>(e)),
        }
    }

    /// Save a shard conditioned on `version`. A single stale-token conflict
    /// reloads fresh and retries once; a second conflict is fatal.
    pub async fn save<D: ShardDocument>(
        &self,
        doc: &D,
        version: &VersionToken,
        message: &str,
    ) -> StoreResult<VersionToken> {
        let bytes = self.encode(doc)?;

        // Clean attempt with the caller's token.
        match self.blobs.put(D::NAME, &bytes, Some(version), message).await {
            Ok(new_version) => {
                self.cache.put(doc, &new_version);
                Ok(new_version)
            }
            Err(BlobError::Conflict(_)) => {
                warn!(shard = D::NAME, "stale version token, reloading for retry");
                // Conflict state: one fresh reload (never the cache), then
                // one retried attempt. A second conflict is fatal.
                let fresh = self.load_uncached::<D>().await?;
                match self
                    .blobs
                    .put(D::NAME, &bytes, Some(&fresh.version), message)
                    .await
                {
                    Ok(new_version) => {
                        self.cache.put(doc, &new_version);
                        Ok(new_version)
                    }
                    Err(BlobError::Conflict(_)) => {
                        self.cache.invalidate(D::NAME);
                        Err(StoreError::Conflict { name: D::NAME })
                    }
                    Err(e) => {
                        self.cache.invalidate(D::NAME);
                        Err(Self::blob_failure::<D>(e))
                    }
                }
            }
            Err(e) => {
                self.cache.invalidate(D::NAME);
                Err(Self::blob_failure::<D>(e))
            }
        }
    }

    /// Persist the schema's empty default over a missing (`base: None`) or
    /// corrupt (`base: Some`) remote copy.
    async fn heal<D: ShardDocument>(
        &self,
        base: Option<&VersionToken>,
    ) -> StoreResult<Loaded<D>> {
        let doc = D::default();
        let bytes = self.encode(&doc)?;
        match self.blobs.put(D::NAME, &bytes, base, "heal shard").await {
            Ok(version) => {
                self.cache.put(&doc, &version);
                Ok(Loaded { doc, version })
            }
            Err(BlobError::Conflict(_)) => {
                // Another writer replaced the shard between our fetch and
                // the heal. Take whatever is there now; if that copy is
                // also unreadable, serve the default against its token and
                // let the next save overwrite it.
                let raw = self
                    .blobs
                    .fetch(D::NAME)
                    .await
                    .map_err(Self::blob_failure::<D>)?;
                let doc = SealedPayload::from_bytes(&raw.bytes)
                    .and_then(|payload| self.codec.open::<D>(&payload))
                    .unwrap_or_default();
                self.cache.put(&doc, &raw.version);
                Ok(Loaded {
                    doc,
                    version: raw.version,
                })
            }
            Err(e) => Err(Self::blob_failure::<D>(e)),
        }
    }

    fn encode<D: ShardDocument>(&self, doc: &D) -> StoreResult<Vec<u8>> {
        let payload = self.codec.seal(doc)?;
        Ok(payload.to_bytes()?)
    }

    fn blob_failure<D: ShardDocument>(e: BlobError) -> StoreError {
        match e {
            // Conflicts are handled at the call sites; a leftover one here
            // still maps to the fatal form.
            BlobError::Conflict(_) => StoreError::Conflict { name: D::NAME },
            BlobError::NotFound(name) => {
                StoreError::Unavailable(format!("object vanished: {name}"))
            }
            BlobError::Unavailable(reason) => StoreError::Unavailable(reason),
        }
    }
}

impl std::fmt::Debug for ShardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardStore")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekko_codec::EncryptionKey;
    use ekko_types::{ContentId, PostsDoc, RankingDoc, ShardDocument};
    use crate::memory::InMemoryBlobStore;

    fn codec() -> DocumentCodec {
        DocumentCodec::new(&EncryptionKey::from_bytes([9u8; 32]))
    }

    fn store_with(blobs: Arc<InMemoryBlobStore>, ttl: Duration) -> ShardStore {
        ShardStore::new(blobs, codec(), ttl)
    }

    fn sample_ranking() -> RankingDoc {
        let mut doc = RankingDoc::default();
        doc.scores.insert(ContentId::new("c_1"), 21.0);
        doc
    }

    // -----------------------------------------------------------------------
    // Bootstrap and healing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn absent_shard_bootstraps_empty_default() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        let loaded = store.load::<PostsDoc>().await.unwrap();
        assert_eq!(loaded.doc, PostsDoc::default());
        // The default was persisted, not just fabricated in memory.
        assert!(blobs.contains(PostsDoc::NAME));
    }

    #[tokio::test]
    async fn corrupt_shard_is_healed_in_place() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs
            .put(RankingDoc::NAME, b"\x00not a sealed payload", None, "seed")
            .await
            .unwrap();
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        let loaded = store.load::<RankingDoc>().await.unwrap();
        assert_eq!(loaded.doc, RankingDoc::default());

        // The remote copy now opens cleanly.
        let healed = blobs.raw_bytes(RankingDoc::NAME).unwrap();
        let payload = SealedPayload::from_bytes(&healed).unwrap();
        let doc: RankingDoc = codec().open(&payload).unwrap();
        assert_eq!(doc, RankingDoc::default());
    }

    #[tokio::test]
    async fn wrong_key_is_corruption_not_failure() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        // Seed a payload sealed under a different key.
        let foreign = DocumentCodec::new(&EncryptionKey::from_bytes([1u8; 32]));
        let bytes = foreign
            .seal(&sample_ranking())
            .unwrap()
            .to_bytes()
            .unwrap();
        blobs.put(RankingDoc::NAME, &bytes, None, "seed").await.unwrap();

        let store = store_with(blobs, Duration::from_secs(10));
        let loaded = store.load::<RankingDoc>().await.unwrap();
        // Undecryptable degrades to the empty default, never an error.
        assert_eq!(loaded.doc, RankingDoc::default());
    }

    // -----------------------------------------------------------------------
    // Cache behavior
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn second_load_is_served_from_cache() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        store.load::<PostsDoc>().await.unwrap();
        let fetches_after_first = blobs.fetch_count();
        store.load::<PostsDoc>().await.unwrap();
        assert_eq!(blobs.fetch_count(), fetches_after_first);
    }

    #[tokio::test]
    async fn expired_cache_entry_refetches() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_millis(20));

        store.load::<PostsDoc>().await.unwrap();
        let fetches_after_first = blobs.fetch_count();

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.load::<PostsDoc>().await.unwrap();
        assert_eq!(blobs.fetch_count(), fetches_after_first + 1);
    }

    #[tokio::test]
    async fn save_refreshes_cache_with_new_token() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        let loaded = store.load::<RankingDoc>().await.unwrap();
        let doc = sample_ranking();
        let saved = store
            .save(&doc, &loaded.version, "set score")
            .await
            .unwrap();

        // The next load must come from cache and reflect the save.
        let fetches = blobs.fetch_count();
        let reloaded = store.load::<RankingDoc>().await.unwrap();
        assert_eq!(blobs.fetch_count(), fetches);
        assert_eq!(reloaded.doc, doc);
        assert_eq!(reloaded.version, saved);
    }

    // -----------------------------------------------------------------------
    // Conflict retry state machine
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn single_stale_token_recovers_invisibly() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        let loaded = store.load::<RankingDoc>().await.unwrap();

        // Another writer advances the shard behind our back.
        let theirs = codec()
            .seal(&RankingDoc::default())
            .unwrap()
            .to_bytes()
            .unwrap();
        blobs
            .put(RankingDoc::NAME, &theirs, Some(&loaded.version), "other writer")
            .await
            .unwrap();

        // Our save holds a stale token but must succeed via the retry.
        let doc = sample_ranking();
        store
            .save(&doc, &loaded.version, "set score")
            .await
            .unwrap();

        let raw = blobs.raw_bytes(RankingDoc::NAME).unwrap();
        let stored: RankingDoc = codec()
            .open(&SealedPayload::from_bytes(&raw).unwrap())
            .unwrap();
        assert_eq!(stored, doc);
    }

    #[tokio::test]
    async fn double_conflict_is_fatal() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        let loaded = store.load::<RankingDoc>().await.unwrap();

        // Both the clean attempt and the retried attempt go stale.
        blobs.fail_next_puts(2);
        let err = store
            .save(&sample_ranking(), &loaded.version, "set score")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict { name } if name == RankingDoc::NAME
        ));
    }

    #[tokio::test]
    async fn conflict_retry_uses_exactly_one_reload() {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let store = store_with(blobs.clone(), Duration::from_secs(10));

        let loaded = store.load::<RankingDoc>().await.unwrap();
        let fetches_before = blobs.fetch_count();

        blobs.fail_next_puts(1);
        store
            .save(&sample_ranking(), &loaded.version, "set score")
            .await
            .unwrap();

        // One forced conflict, one fresh reload, one successful retry.
        assert_eq!(blobs.fetch_count(), fetches_before + 1);
    }
}
