//! Secondary index maintenance for the ekko feeds.
//!
//! The index shard holds ordered content-id lists: the `latest` and
//! `trending` feeds plus per-user, per-audio, and per-language lists.
//! The functions here keep those lists consistent with the set of posts
//! that actually exist: an id may appear in an index only while its post
//! does. All mutation is in-memory; persisting the shards is the caller's
//! job.

use ekko_types::{AudioId, ContentId, IndexesDoc, RankingDoc, RelationsDoc, UserId};

/// Register a freshly created post in the indexes.
///
/// Prepends to `latest` and to the owner's, the audio's, and (when the
/// audio's language is known) the language's list, creating lists as
/// needed. `trending` is untouched: a new post has no engagement yet and
/// earns its slot on the first like.
pub fn on_create(
    indexes: &mut IndexesDoc,
    content_id: &ContentId,
    owner_id: &UserId,
    audio_id: &AudioId,
    language: Option<&str>,
) {
    indexes.feeds.latest.insert(0, content_id.clone());
    indexes
        .by_user
        .entry(owner_id.clone())
        .or_default()
        .insert(0, content_id.clone());
    indexes
        .by_audio
        .entry(audio_id.clone())
        .or_default()
        .insert(0, content_id.clone());
    if let Some(lang) = language {
        indexes
            .by_language
            .entry(lang.to_string())
            .or_default()
            .insert(0, content_id.clone());
    }
}

/// React to an engagement event: rebuild the trending feed from the full
/// ranking shard.
pub fn on_like(indexes: &mut IndexesDoc, ranking: &RankingDoc) {
    indexes.feeds.trending = ekko_rank::rebuild_trending(ranking);
}

/// Scrub a deleted post from every index and every like relation.
///
/// The per-language sweep covers all lists rather than just the audio's
/// language: the audio row (and with it the language) may already be gone
/// by the time its posts are deleted.
pub fn on_delete(
    indexes: &mut IndexesDoc,
    relations: &mut RelationsDoc,
    content_id: &ContentId,
    owner_id: &UserId,
    audio_id: &AudioId,
) {
    indexes.feeds.latest.retain(|id| id != content_id);
    indexes.feeds.trending.retain(|id| id != content_id);
    if let Some(list) = indexes.by_user.get_mut(owner_id) {
        list.retain(|id| id != content_id);
    }
    if let Some(list) = indexes.by_audio.get_mut(audio_id) {
        list.retain(|id| id != content_id);
    }
    for list in indexes.by_language.values_mut() {
        list.retain(|id| id != content_id);
    }
    for liked in relations.likes.values_mut() {
        liked.remove(content_id);
    }
}

/// Check the no-dangling-id invariant against the set of existing posts.
///
/// Returns every id that appears in an index or relation without a
/// matching post. Used by tests and by the consistency checks around
/// compound operations; an empty result means the indexes are sound.
pub fn dangling_ids<'a>(
    indexes: &'a IndexesDoc,
    relations: &'a RelationsDoc,
    exists: impl Fn(&ContentId) -> bool,
) -> Vec<&'a ContentId> {
    let mut dangling = Vec::new();
    let mut check = |id: &'a ContentId| {
        if !exists(id) {
            dangling.push(id);
        }
    };

    indexes.feeds.latest.iter().for_each(&mut check);
    indexes.feeds.trending.iter().for_each(&mut check);
    for list in indexes
        .by_user
        .values()
        .chain(indexes.by_audio.values())
        .chain(indexes.by_language.values())
    {
        list.iter().for_each(&mut check);
    }
    for liked in relations.likes.values() {
        liked.iter().for_each(&mut check);
    }
    dangling
}
