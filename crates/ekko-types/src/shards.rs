//! Shard document schemas.
//!
//! All durable state lives in seven named JSON documents ("shards")
//! persisted through the blob store. Each schema carries an empty default
//! used both when a shard does not exist yet and when a corrupt remote
//! copy is healed. Field names follow the wire shape the service has
//! always written (camelCase), so existing remote documents stay readable.
//!
//! Maps and sets are `BTreeMap`/`BTreeSet` so a document always serializes
//! to the same bytes regardless of insertion order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::id::{AudioId, ContentId, UserId};

/// A document schema bound to its remote object name.
///
/// The `Default` impl is the shard's empty document: it is what a missing
/// or corrupt remote copy is replaced with, so it must always be a
/// well-formed value of the schema.
pub trait ShardDocument:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the remote object holding this shard (e.g. `"posts.json"`).
    const NAME: &'static str;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Per-user preference bag, grown by engagement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Audio tracks the user has liked content for.
    pub liked_audio: BTreeSet<AudioId>,
    /// Affinity weights per language tag.
    pub language_weights: BTreeMap<String, f64>,
}

/// A registered user. Users are never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub avatar: String,
    /// Unix milliseconds.
    pub created_at: u64,
    #[serde(default)]
    pub prefs: Preferences,
}

/// `users.json`: map of user id to user record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsersDoc {
    pub users: BTreeMap<UserId, User>,
}

impl ShardDocument for UsersDoc {
    const NAME: &'static str = "users.json";
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// A registered audio track. Immutable once registered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audio {
    pub id: AudioId,
    /// BCP-47-ish language tag (`"en"`, `"pt-BR"`). Drives the
    /// per-language index.
    pub language: String,
    pub title: String,
    pub artist: String,
}

/// `audio.json`: map of audio id to track record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioDoc {
    pub tracks: BTreeMap<AudioId, Audio>,
}

impl AudioDoc {
    /// Language tag of a track, if the track is known.
    pub fn language_of(&self, audio_id: &AudioId) -> Option<&str> {
        self.tracks.get(audio_id).map(|a| a.language.as_str())
    }
}

impl ShardDocument for AudioDoc {
    const NAME: &'static str = "audio.json";
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// The clip a post was cut from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub source_url: String,
    /// Clip bounds in seconds within the source.
    pub start: f64,
    pub end: f64,
    /// Optional cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A content post. Owned by exactly one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: ContentId,
    pub owner_id: UserId,
    pub audio_id: AudioId,
    pub clip: Clip,
    /// Unix milliseconds.
    pub created_at: u64,
}

/// `posts.json`: map of content id to post record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostsDoc {
    pub posts: BTreeMap<ContentId, Post>,
}

impl ShardDocument for PostsDoc {
    const NAME: &'static str = "posts.json";
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Engagement counters for one post.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub likes: u64,
    pub plays: u64,
    pub shares: u64,
    pub comments: u64,
}

/// `metrics.json`: engagement counters keyed by content id.
///
/// The counters live under a `content` key rather than at the top level;
/// that is the shape the service has always persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsDoc {
    pub content: BTreeMap<ContentId, Metrics>,
}

impl ShardDocument for MetricsDoc {
    const NAME: &'static str = "metrics.json";
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// `relations.json`: which users have liked which posts.
///
/// A (user, content) pair appears at most once; the like operation is
/// idempotent on this map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationsDoc {
    pub likes: BTreeMap<UserId, BTreeSet<ContentId>>,
}

impl RelationsDoc {
    /// Returns `true` if `user` has already liked `content`.
    pub fn has_liked(&self, user: &UserId, content: &ContentId) -> bool {
        self.likes
            .get(user)
            .map(|set| set.contains(content))
            .unwrap_or(false)
    }

    /// Record a like. Returns `false` if the pair was already present.
    pub fn record(&mut self, user: &UserId, content: &ContentId) -> bool {
        self.likes
            .entry(user.clone())
            .or_default()
            .insert(content.clone())
    }
}

impl ShardDocument for RelationsDoc {
    const NAME: &'static str = "relations.json";
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// `ranking.json`: trending score per content id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingDoc {
    pub scores: BTreeMap<ContentId, f64>,
}

impl ShardDocument for RankingDoc {
    const NAME: &'static str = "ranking.json";
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

/// The two global feeds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feeds {
    /// All content ids, newest first.
    pub latest: Vec<ContentId>,
    /// Top content ids by score, bounded (see `ekko-rank`).
    pub trending: Vec<ContentId>,
}

/// `indexes.json`: the secondary indexes.
///
/// Every list holds content ids in order. An id may appear in any of these
/// lists only while its post still exists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexesDoc {
    pub feeds: Feeds,
    pub by_user: BTreeMap<UserId, Vec<ContentId>>,
    pub by_audio: BTreeMap<AudioId, Vec<ContentId>>,
    pub by_language: BTreeMap<String, Vec<ContentId>>,
}

impl ShardDocument for IndexesDoc {
    const NAME: &'static str = "indexes.json";
}
