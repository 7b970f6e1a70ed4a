//! Ranking engine for the ekko feeds.
//!
//! Pure functions only: scoring takes engagement counters and timestamps,
//! the trending rebuild takes the ranking shard. No I/O, no clocks; the
//! caller supplies `now`, which keeps every result reproducible in tests.

use ekko_types::{ContentId, Metrics, RankingDoc};

/// Maximum number of entries in the trending feed.
pub const TRENDING_LIMIT: usize = 20;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Trending score for one post.
///
/// Weighted engagement plus a stepped freshness bonus for young posts:
/// +15 under an hour, +10 under six, +5 under a day.
pub fn score(metrics: &Metrics, created_at_ms: u64, now_ms: u64) -> f64 {
    let age_hours = now_ms.saturating_sub(created_at_ms) as f64 / MS_PER_HOUR;
    let freshness = if age_hours < 1.0 {
        15.0
    } else if age_hours < 6.0 {
        10.0
    } else if age_hours < 24.0 {
        5.0
    } else {
        0.0
    };

    metrics.likes as f64 * 3.0
        + metrics.shares as f64 * 5.0
        + metrics.comments as f64 * 4.0
        + metrics.plays as f64 * 0.5
        + freshness
}

/// Rebuild the trending feed from the full ranking shard.
///
/// Entries are ordered by score descending; ties go to the greater content
/// id, which (ids being time-ordered) means the newer post. Truncated to
/// [`TRENDING_LIMIT`].
pub fn rebuild_trending(ranking: &RankingDoc) -> Vec<ContentId> {
    let mut entries: Vec<(&ContentId, f64)> =
        ranking.scores.iter().map(|(id, s)| (id, *s)).collect();
    entries.sort_by(|(a_id, a_score), (b_id, b_score)| {
        b_score
            .total_cmp(a_score)
            .then_with(|| b_id.cmp(a_id))
    });
    entries
        .into_iter()
        .take(TRENDING_LIMIT)
        .map(|(id, _)| id.clone())
        .collect()
}
