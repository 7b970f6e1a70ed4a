use std::sync::Arc;

use chrono::Utc;
use ekko_codec::DocumentCodec;
use ekko_store::{BlobStore, GitHubBlobStore, ShardStore};
use ekko_types::{
    Audio, AudioDoc, AudioId, ContentId, IndexesDoc, Metrics, MetricsDoc, Post, PostsDoc,
    Preferences, RankingDoc, RelationsDoc, User, UserId, UsersDoc,
};
use tracing::info;

use crate::api::{
    CreateContentRequest, CreateUserRequest, LikeOutcome, LikeRequest, RegisterAudioRequest,
};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};

/// Maximum number of entries returned by `suggest`.
pub const SUGGEST_LIMIT: usize = 10;

/// The consistency coordinator.
///
/// Each compound operation loads every shard it touches, mutates the
/// in-memory copies, and persists the touched shards in a fixed order.
/// The orders are chosen so that no shard ever references a content id
/// that is not yet durable in a more authoritative shard: the post row is
/// always written before the indexes on create, and every shard that
/// could reference a deleted id is written before a delete reports
/// success. There is no rollback: a failure mid-sequence fails the
/// operation and leaves the earlier saves committed.
pub struct Ekko {
    store: ShardStore,
}

impl Ekko {
    /// Build a coordinator over an arbitrary blob backend.
    pub fn new(config: &CoreConfig, blobs: Arc<dyn BlobStore>) -> CoreResult<Self> {
        config.validate()?;
        let codec = DocumentCodec::new(&config.key()?);
        Ok(Self {
            store: ShardStore::new(blobs, codec, config.cache_ttl),
        })
    }

    /// Build a coordinator over the production GitHub backend.
    pub fn with_github(config: &CoreConfig) -> CoreResult<Self> {
        let blobs = Arc::new(GitHubBlobStore::new(config.store.clone()));
        Self::new(config, blobs)
    }

    fn now_ms() -> u64 {
        Utc::now().timestamp_millis() as u64
    }

    // -----------------------------------------------------------------------
    // Registration operations
    // -----------------------------------------------------------------------

    /// Create a user with an empty preference bag.
    pub async fn create_user(&self, req: CreateUserRequest) -> CoreResult<UserId> {
        let now = Self::now_ms();
        let id = UserId::allocate(now);
        let name = if req.name.is_empty() {
            "Anonymous".to_string()
        } else {
            req.name
        };

        let mut users = self.store.load::<UsersDoc>().await?;
        users.doc.users.insert(
            id.clone(),
            User {
                id: id.clone(),
                name,
                avatar: req.avatar,
                created_at: now,
                prefs: Preferences::default(),
            },
        );
        self.store
            .save(&users.doc, &users.version, "create user")
            .await?;

        info!(user = %id, "user created");
        Ok(id)
    }

    /// Register an audio track. Tracks are immutable: a duplicate id is
    /// rejected.
    pub async fn register_audio(&self, req: RegisterAudioRequest) -> CoreResult<AudioId> {
        if req.id.is_empty() || req.language.is_empty() {
            return Err(CoreError::Validation(
                "audio id and language are required".into(),
            ));
        }

        let mut audio = self.store.load::<AudioDoc>().await?;
        if audio.doc.tracks.contains_key(&req.id) {
            return Err(CoreError::AudioExists(req.id));
        }
        audio.doc.tracks.insert(
            req.id.clone(),
            Audio {
                id: req.id.clone(),
                language: req.language,
                title: req.title,
                artist: req.artist,
            },
        );
        self.store
            .save(&audio.doc, &audio.version, "register audio")
            .await?;

        info!(audio = %req.id, "audio registered");
        Ok(req.id)
    }

    // -----------------------------------------------------------------------
    // Content operations
    // -----------------------------------------------------------------------

    /// Create a post.
    ///
    /// Writes the post row, zeroed metrics, and a zero ranking entry, then
    /// registers the post in the indexes. Saves posts, metrics, ranking,
    /// indexes, with the index shard strictly last.
    pub async fn create_content(&self, req: CreateContentRequest) -> CoreResult<ContentId> {
        if req.owner_id.is_empty() || req.audio_id.is_empty() || req.clip.source_url.is_empty() {
            return Err(CoreError::Validation(
                "ownerId, audioId, and clip are required".into(),
            ));
        }

        let now = Self::now_ms();
        let id = ContentId::allocate(now);

        let audio = self.store.load::<AudioDoc>().await?;
        let mut posts = self.store.load::<PostsDoc>().await?;
        let mut metrics = self.store.load::<MetricsDoc>().await?;
        let mut ranking = self.store.load::<RankingDoc>().await?;
        let mut indexes = self.store.load::<IndexesDoc>().await?;

        let language = audio.doc.language_of(&req.audio_id).map(str::to_string);

        posts.doc.posts.insert(
            id.clone(),
            Post {
                id: id.clone(),
                owner_id: req.owner_id.clone(),
                audio_id: req.audio_id.clone(),
                clip: req.clip,
                created_at: now,
            },
        );
        metrics.doc.content.insert(id.clone(), Metrics::default());
        // A new post ranks only after it gains engagement.
        ranking.doc.scores.insert(id.clone(), 0.0);
        ekko_index::on_create(
            &mut indexes.doc,
            &id,
            &req.owner_id,
            &req.audio_id,
            language.as_deref(),
        );

        self.store
            .save(&posts.doc, &posts.version, "create content")
            .await?;
        self.store
            .save(&metrics.doc, &metrics.version, "create content")
            .await?;
        self.store
            .save(&ranking.doc, &ranking.version, "create content")
            .await?;
        self.store
            .save(&indexes.doc, &indexes.version, "create content")
            .await?;

        info!(content = %id, owner = %req.owner_id, "content created");
        Ok(id)
    }

    /// Like a post. Idempotent: a repeated (user, content) pair is a no-op
    /// reported as `liked: false`.
    pub async fn like_content(&self, req: LikeRequest) -> CoreResult<LikeOutcome> {
        if req.user_id.is_empty() || req.content_id.is_empty() {
            return Err(CoreError::Validation(
                "userId and contentId are required".into(),
            ));
        }

        let mut relations = self.store.load::<RelationsDoc>().await?;
        if relations.doc.has_liked(&req.user_id, &req.content_id) {
            return Ok(LikeOutcome { liked: false });
        }

        let posts = self.store.load::<PostsDoc>().await?;
        let created_at = posts
            .doc
            .posts
            .get(&req.content_id)
            .map(|post| post.created_at)
            .ok_or_else(|| CoreError::NotFound(req.content_id.clone()))?;

        let mut metrics = self.store.load::<MetricsDoc>().await?;
        let mut ranking = self.store.load::<RankingDoc>().await?;
        let mut indexes = self.store.load::<IndexesDoc>().await?;

        relations.doc.record(&req.user_id, &req.content_id);
        let counters = metrics
            .doc
            .content
            .entry(req.content_id.clone())
            .or_default();
        counters.likes += 1;
        let counters = *counters;

        ranking.doc.scores.insert(
            req.content_id.clone(),
            ekko_rank::score(&counters, created_at, Self::now_ms()),
        );
        ekko_index::on_like(&mut indexes.doc, &ranking.doc);

        self.store
            .save(&relations.doc, &relations.version, "like content")
            .await?;
        self.store
            .save(&metrics.doc, &metrics.version, "like content")
            .await?;
        self.store
            .save(&ranking.doc, &ranking.version, "like content")
            .await?;
        self.store
            .save(&indexes.doc, &indexes.version, "like content")
            .await?;

        info!(content = %req.content_id, user = %req.user_id, "content liked");
        Ok(LikeOutcome { liked: true })
    }

    /// Delete a post and every trace of it.
    ///
    /// Saves posts, metrics, ranking, relations, indexes (every shard
    /// that could reference the deleted id) before reporting success.
    pub async fn delete_content(&self, content_id: &ContentId) -> CoreResult<ContentId> {
        if content_id.is_empty() {
            return Err(CoreError::Validation("contentId is required".into()));
        }

        let mut posts = self.store.load::<PostsDoc>().await?;
        let mut metrics = self.store.load::<MetricsDoc>().await?;
        let mut ranking = self.store.load::<RankingDoc>().await?;
        let mut relations = self.store.load::<RelationsDoc>().await?;
        let mut indexes = self.store.load::<IndexesDoc>().await?;

        let post = posts
            .doc
            .posts
            .remove(content_id)
            .ok_or_else(|| CoreError::NotFound(content_id.clone()))?;

        metrics.doc.content.remove(content_id);
        ranking.doc.scores.remove(content_id);
        ekko_index::on_delete(
            &mut indexes.doc,
            &mut relations.doc,
            content_id,
            &post.owner_id,
            &post.audio_id,
        );

        self.store
            .save(&posts.doc, &posts.version, "delete content")
            .await?;
        self.store
            .save(&metrics.doc, &metrics.version, "delete content")
            .await?;
        self.store
            .save(&ranking.doc, &ranking.version, "delete content")
            .await?;
        self.store
            .save(&relations.doc, &relations.version, "delete content")
            .await?;
        self.store
            .save(&indexes.doc, &indexes.version, "delete content")
            .await?;

        info!(content = %content_id, "content deleted");
        Ok(content_id.clone())
    }

    // -----------------------------------------------------------------------
    // Read-only queries
    // -----------------------------------------------------------------------

    /// Related posts for a source post: same audio, same language, and
    /// whatever is trending. First-seen order, source excluded, capped at
    /// [`SUGGEST_LIMIT`].
    pub async fn suggest(&self, content_id: &ContentId) -> CoreResult<Vec<Post>> {
        let posts = self.store.load::<PostsDoc>().await?;
        let post = posts
            .doc
            .posts
            .get(content_id)
            .ok_or_else(|| CoreError::NotFound(content_id.clone()))?;

        let audio = self.store.load::<AudioDoc>().await?;
        let indexes = self.store.load::<IndexesDoc>().await?;

        let empty = Vec::new();
        let by_audio = indexes.doc.by_audio.get(&post.audio_id).unwrap_or(&empty);
        let by_language = audio
            .doc
            .language_of(&post.audio_id)
            .and_then(|lang| indexes.doc.by_language.get(lang))
            .unwrap_or(&empty);

        let mut picked: Vec<ContentId> = Vec::new();
        for id in by_audio
            .iter()
            .chain(by_language.iter())
            .chain(indexes.doc.feeds.trending.iter())
        {
            if id == content_id || picked.contains(id) {
                continue;
            }
            picked.push(id.clone());
            if picked.len() == SUGGEST_LIMIT {
                break;
            }
        }

        Ok(hydrate(&picked, &posts.doc))
    }

    /// The latest feed, newest first.
    pub async fn latest_feed(&self) -> CoreResult<Vec<Post>> {
        let indexes = self.store.load::<IndexesDoc>().await?;
        let posts = self.store.load::<PostsDoc>().await?;
        Ok(hydrate(&indexes.doc.feeds.latest, &posts.doc))
    }

    /// The trending feed, highest score first.
    pub async fn trending_feed(&self) -> CoreResult<Vec<Post>> {
        let indexes = self.store.load::<IndexesDoc>().await?;
        let posts = self.store.load::<PostsDoc>().await?;
        Ok(hydrate(&indexes.doc.feeds.trending, &posts.doc))
    }
}

/// Resolve an ordered id list against the posts shard. Ids without a post
/// are skipped; the no-dangling-id invariant makes that a non-event in
/// practice.
fn hydrate(ids: &[ContentId], posts: &PostsDoc) -> Vec<Post> {
    ids.iter()
        .filter_map(|id| posts.posts.get(id).cloned())
        .collect()
}

impl std::fmt::Debug for Ekko {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ekko").field("store", &self.store).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ekko_codec::EncryptionKey;
    use ekko_store::{GitHubConfig, InMemoryBlobStore, StoreError};
    use ekko_types::{Clip, ShardDocument};

    const KEY_HEX_BYTE: &str = "07";

    fn config(cache_ttl: Duration) -> CoreConfig {
        CoreConfig {
            store: GitHubConfig {
                owner: "acme".into(),
                repo: "ekko-data".into(),
                token: "t".into(),
                ..Default::default()
            },
            encryption_key: KEY_HEX_BYTE.repeat(32),
            cache_ttl,
        }
    }

    fn harness(cache_ttl: Duration) -> (Ekko, Arc<InMemoryBlobStore>) {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let ekko = Ekko::new(&config(cache_ttl), blobs.clone()).unwrap();
        (ekko, blobs)
    }

    /// Independent reader over the same blobs: zero TTL, so every load
    /// reflects durable state rather than the coordinator's cache.
    fn verifier(blobs: Arc<InMemoryBlobStore>) -> ShardStore {
        let codec = DocumentCodec::new(&EncryptionKey::from_hex(&KEY_HEX_BYTE.repeat(32)).unwrap());
        ShardStore::new(blobs, codec, Duration::ZERO)
    }

    fn clip() -> Clip {
        Clip {
            source_url: "https://example.com/v.mp4".into(),
            start: 3.0,
            end: 18.0,
            image: None,
        }
    }

    async fn register(ekko: &Ekko, id: &str, language: &str) {
        ekko.register_audio(RegisterAudioRequest {
            id: AudioId::new(id),
            language: language.into(),
            title: "Song".into(),
            artist: "Artist".into(),
        })
        .await
        .unwrap();
    }

    async fn create(ekko: &Ekko, owner: &str, audio: &str) -> ContentId {
        ekko.create_content(CreateContentRequest {
            owner_id: UserId::new(owner),
            audio_id: AudioId::new(audio),
            clip: clip(),
        })
        .await
        .unwrap()
    }

    async fn like(ekko: &Ekko, user: &str, content: &ContentId) -> LikeOutcome {
        ekko.like_content(LikeRequest {
            user_id: UserId::new(user),
            content_id: content.clone(),
        })
        .await
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // The end-to-end lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_like_delete_lifecycle() {
        let (ekko, blobs) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        let a = create(&ekko, "u_1", "a_1").await;

        // After create: listed everywhere except trending.
        let check = verifier(blobs.clone());
        let indexes = check.load::<IndexesDoc>().await.unwrap().doc;
        assert_eq!(indexes.feeds.latest, vec![a.clone()]);
        assert_eq!(indexes.by_user[&UserId::new("u_1")], vec![a.clone()]);
        assert_eq!(indexes.by_language["en"], vec![a.clone()]);
        assert!(indexes.feeds.trending.is_empty());

        // Like from another user: counted once, now trending.
        assert_eq!(like(&ekko, "u_2", &a).await, LikeOutcome { liked: true });
        let metrics = check.load::<MetricsDoc>().await.unwrap().doc;
        assert_eq!(metrics.content[&a].likes, 1);
        let indexes = check.load::<IndexesDoc>().await.unwrap().doc;
        assert_eq!(indexes.feeds.trending, vec![a.clone()]);

        // Second like is a no-op.
        assert_eq!(like(&ekko, "u_2", &a).await, LikeOutcome { liked: false });
        let metrics = check.load::<MetricsDoc>().await.unwrap().doc;
        assert_eq!(metrics.content[&a].likes, 1);

        // Delete: every trace gone.
        ekko.delete_content(&a).await.unwrap();
        let posts = check.load::<PostsDoc>().await.unwrap().doc;
        let metrics = check.load::<MetricsDoc>().await.unwrap().doc;
        let ranking = check.load::<RankingDoc>().await.unwrap().doc;
        let relations = check.load::<RelationsDoc>().await.unwrap().doc;
        let indexes = check.load::<IndexesDoc>().await.unwrap().doc;
        assert!(posts.posts.is_empty());
        assert!(metrics.content.is_empty());
        assert!(ranking.scores.is_empty());
        assert!(!relations.has_liked(&UserId::new("u_2"), &a));
        assert!(indexes.feeds.latest.is_empty());
        assert!(indexes.feeds.trending.is_empty());
        assert!(indexes.by_user[&UserId::new("u_1")].is_empty());
        assert!(indexes.by_language["en"].is_empty());
    }

    #[tokio::test]
    async fn referential_integrity_after_mixed_operations() {
        let (ekko, blobs) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        register(&ekko, "a_2", "pt").await;

        let p1 = create(&ekko, "u_1", "a_1").await;
        let p2 = create(&ekko, "u_1", "a_2").await;
        let p3 = create(&ekko, "u_2", "a_1").await;
        like(&ekko, "u_2", &p1).await;
        like(&ekko, "u_3", &p1).await;
        like(&ekko, "u_1", &p3).await;
        ekko.delete_content(&p1).await.unwrap();

        let check = verifier(blobs);
        let posts = check.load::<PostsDoc>().await.unwrap().doc;
        let metrics = check.load::<MetricsDoc>().await.unwrap().doc;
        let ranking = check.load::<RankingDoc>().await.unwrap().doc;
        let relations = check.load::<RelationsDoc>().await.unwrap().doc;
        let indexes = check.load::<IndexesDoc>().await.unwrap().doc;

        // Nothing in any index points at a missing post.
        let dangling =
            ekko_index::dangling_ids(&indexes, &relations, |id| posts.posts.contains_key(id));
        assert!(dangling.is_empty(), "dangling ids: {dangling:?}");

        // And every surviving post has exactly its metrics and ranking row.
        for id in posts.posts.keys() {
            assert!(metrics.content.contains_key(id));
            assert!(ranking.scores.contains_key(id));
        }
        assert_eq!(metrics.content.len(), posts.posts.len());
        assert_eq!(ranking.scores.len(), posts.posts.len());
        assert!(posts.posts.contains_key(&p2));
        assert!(posts.posts.contains_key(&p3));
    }

    // -----------------------------------------------------------------------
    // Validation and not-found paths
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn create_requires_all_arguments() {
        let (ekko, _) = harness(Duration::from_secs(10));
        let err = ekko
            .create_content(CreateContentRequest {
                owner_id: UserId::new(""),
                audio_id: AudioId::new("a_1"),
                clip: clip(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let err = ekko
            .create_content(CreateContentRequest {
                owner_id: UserId::new("u_1"),
                audio_id: AudioId::new("a_1"),
                clip: Clip {
                    source_url: String::new(),
                    ..clip()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn like_unknown_content_is_not_found() {
        let (ekko, _) = harness(Duration::from_secs(10));
        let err = ekko
            .like_content(LikeRequest {
                user_id: UserId::new("u_1"),
                content_id: ContentId::new("c_missing"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_unknown_content_is_not_found() {
        let (ekko, _) = harness(Duration::from_secs(10));
        let err = ekko
            .delete_content(&ContentId::new("c_missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_audio_is_rejected() {
        let (ekko, _) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        let err = ekko
            .register_audio(RegisterAudioRequest {
                id: AudioId::new("a_1"),
                language: "pt".into(),
                title: String::new(),
                artist: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AudioExists(_)));
    }

    #[tokio::test]
    async fn create_user_defaults_to_anonymous() {
        let (ekko, blobs) = harness(Duration::from_secs(10));
        let id = ekko.create_user(CreateUserRequest::default()).await.unwrap();

        let users = verifier(blobs).load::<UsersDoc>().await.unwrap().doc;
        let user = &users.users[&id];
        assert_eq!(user.name, "Anonymous");
        assert!(user.prefs.liked_audio.is_empty());
    }

    // -----------------------------------------------------------------------
    // Suggestions and feeds
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn suggest_unions_dedups_and_excludes_source() {
        let (ekko, _) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        register(&ekko, "a_2", "en").await;

        let a = create(&ekko, "u_1", "a_1").await;
        let b = create(&ekko, "u_1", "a_1").await;
        let c = create(&ekko, "u_2", "a_2").await;
        // a_3 is unregistered: no language, indexed by audio only.
        let d = create(&ekko, "u_2", "a_3").await;
        like(&ekko, "u_9", &c).await;
        like(&ekko, "u_9", &d).await;

        let suggestions = ekko.suggest(&a).await.unwrap();
        let ids: Vec<&ContentId> = suggestions.iter().map(|p| &p.id).collect();
        // Same audio first (b), then same language (c), then trending (d).
        assert_eq!(ids, vec![&b, &c, &d]);
    }

    #[tokio::test]
    async fn suggest_truncates_to_limit() {
        let (ekko, _) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        let first = create(&ekko, "u_1", "a_1").await;
        for _ in 0..(SUGGEST_LIMIT + 3) {
            create(&ekko, "u_1", "a_1").await;
        }
        let suggestions = ekko.suggest(&first).await.unwrap();
        assert_eq!(suggestions.len(), SUGGEST_LIMIT);
        assert!(suggestions.iter().all(|p| p.id != first));
    }

    #[tokio::test]
    async fn suggest_unknown_content_is_not_found() {
        let (ekko, _) = harness(Duration::from_secs(10));
        let err = ekko.suggest(&ContentId::new("c_missing")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn feeds_hydrate_posts_in_index_order() {
        let (ekko, _) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        let a = create(&ekko, "u_1", "a_1").await;
        let b = create(&ekko, "u_1", "a_1").await;
        like(&ekko, "u_2", &a).await;

        let latest = ekko.latest_feed().await.unwrap();
        let ids: Vec<&ContentId> = latest.iter().map(|p| &p.id).collect();
        assert_eq!(ids, vec![&b, &a]);

        let trending = ekko.trending_feed().await.unwrap();
        assert_eq!(trending[0].id, a);
    }

    // -----------------------------------------------------------------------
    // Failure behavior
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn double_conflict_fails_the_operation() {
        let (ekko, blobs) = harness(Duration::from_secs(10));
        register(&ekko, "a_1", "en").await;
        let a = create(&ekko, "u_1", "a_1").await;
        // Bootstrap the relations shard so the next like starts at a save.
        like(&ekko, "u_2", &a).await;

        blobs.fail_next_puts(2);
        let err = ekko
            .like_content(LikeRequest {
                user_id: UserId::new("u_3"),
                content_id: a.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn corrupt_ranking_shard_heals_during_like() {
        // Zero TTL so the coordinator sees the corrupted remote copy.
        let (ekko, blobs) = harness(Duration::ZERO);
        register(&ekko, "a_1", "en").await;
        let a = create(&ekko, "u_1", "a_1").await;

        // Clobber the ranking shard behind the coordinator's back.
        let raw = blobs.fetch(RankingDoc::NAME).await.unwrap();
        blobs
            .put(RankingDoc::NAME, b"\x00garbage", Some(&raw.version), "clobber")
            .await
            .unwrap();

        // The like proceeds as if the shard started empty, then rescoring
        // reinstates the liked post.
        like(&ekko, "u_2", &a).await;
        let ranking = verifier(blobs).load::<RankingDoc>().await.unwrap().doc;
        assert!(ranking.scores[&a] > 0.0);
    }
}
