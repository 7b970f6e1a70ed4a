use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ekko_types::{ShardDocument, VersionToken};

/// Default time a cached shard stays servable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    version: VersionToken,
    stored_at: Instant,
}

/// Time-bounded cache of decrypted shard documents.
///
/// One entry per shard name, keyed by [`ShardDocument::NAME`]. An entry is
/// served only while younger than the TTL; expired entries are dropped on
/// access. The cache is replaced on every successful load or save of a
/// name and invalidated when a save of that name fails, so it can never
/// hand out a document this process knows to be stale.
pub struct ShardCache {
    ttl: Duration,
    entries: Mutex<HashMap<&'static str, CacheEntry>>,
}

impl ShardCache {
    /// Create a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached document and token for `D`, if fresh.
    pub fn get<D: ShardDocument>(&self) -> Option<(D, VersionToken)> {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let entry = entries.get(D::NAME)?;
        if entry.stored_at.elapsed() >= self.ttl {
            entries.remove(D::NAME);
            return None;
        }
        let doc = entry.value.clone().downcast::<D>().ok()?;
        Some((doc.as_ref().clone(), entry.version.clone()))
    }

    /// Store the document and token for `D`, stamped now.
    pub fn put<D: ShardDocument>(&self, doc: &D, version: &VersionToken) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.insert(
            D::NAME,
            CacheEntry {
                value: Arc::new(doc.clone()),
                version: version.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for a shard name, if present.
    pub fn invalidate(&self, name: &str) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.remove(name);
    }
}

impl Default for ShardCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl std::fmt::Debug for ShardCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.lock().expect("lock poisoned").len();
        f.debug_struct("ShardCache")
            .field("ttl", &self.ttl)
            .field("entries", &count)
            .finish()
    }
}
