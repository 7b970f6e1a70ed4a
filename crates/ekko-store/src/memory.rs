use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use ekko_types::VersionToken;

use crate::error::{BlobError, BlobResult};
use crate::traits::{BlobStore, RawBlob};

struct StoredBlob {
    bytes: Vec<u8>,
    revision: u64,
}

/// In-memory blob store for tests and embedding.
///
/// Objects live in a `HashMap` behind a `Mutex`; version tokens are
/// per-object revision counters. The store also counts fetches/puts and
/// can be told to fail upcoming puts with a conflict, which the shard
/// store's retry tests rely on.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, StoredBlob>>,
    fetches: AtomicUsize,
    puts: AtomicUsize,
    forced_conflicts: AtomicUsize,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetch calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of put calls attempted so far (including failed ones).
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }

    /// Make the next `n` put calls fail with a version conflict regardless
    /// of the presented token.
    pub fn fail_next_puts(&self, n: usize) {
        self.forced_conflicts.store(n, Ordering::Relaxed);
    }

    /// Returns `true` if the named object exists.
    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().expect("lock poisoned").contains_key(name)
    }

    /// Raw bytes of the named object, if present. Test inspection only.
    pub fn raw_bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("lock poisoned")
            .get(name)
            .map(|b| b.bytes.clone())
    }

    fn token(name: &str, revision: u64) -> VersionToken {
        VersionToken::new(format!("{name}@{revision}"))
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn fetch(&self, name: &str) -> BlobResult<RawBlob> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.lock().expect("lock poisoned");
        match objects.get(name) {
            Some(blob) => Ok(RawBlob {
                bytes: blob.bytes.clone(),
                version: Self::token(name, blob.revision),
            }),
            None => Err(BlobError::NotFound(name.to_string())),
        }
    }

    async fn put(
        &self,
        name: &str,
        bytes: &[u8],
        base: Option<&VersionToken>,
        _message: &str,
    ) -> BlobResult<VersionToken> {
        self.puts.fetch_add(1, Ordering::Relaxed);

        // Scripted conflicts take precedence over real token checks.
        let forced = self.forced_conflicts.load(Ordering::Relaxed);
        if forced > 0 {
            self.forced_conflicts.store(forced - 1, Ordering::Relaxed);
            return Err(BlobError::Conflict(name.to_string()));
        }

        let mut objects = self.objects.lock().expect("lock poisoned");
        match objects.get_mut(name) {
            Some(existing) => {
                let current = Self::token(name, existing.revision);
                match base {
                    Some(token) if *token == current => {
                        existing.bytes = bytes.to_vec();
                        existing.revision += 1;
                        Ok(Self::token(name, existing.revision))
                    }
                    // Stale token, or an unconditional create racing an
                    // existing object.
                    _ => Err(BlobError::Conflict(name.to_string())),
                }
            }
            None => {
                if base.is_some() {
                    // A conditional write against a vanished object can
                    // only mean someone deleted it; surface as conflict.
                    return Err(BlobError::Conflict(name.to_string()));
                }
                objects.insert(
                    name.to_string(),
                    StoredBlob {
                        bytes: bytes.to_vec(),
                        revision: 1,
                    },
                );
                Ok(Self::token(name, 1))
            }
        }
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.objects.lock().expect("lock poisoned").len();
        f.debug_struct("InMemoryBlobStore")
            .field("object_count", &count)
            .finish()
    }
}
