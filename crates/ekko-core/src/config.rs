use std::time::Duration;

use ekko_codec::EncryptionKey;
use ekko_store::GitHubConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Configuration for the ekko core.
///
/// Filled in by the (out-of-scope) bootstrapper from the environment.
/// `validate` mirrors the service's readiness gate: the store location,
/// credentials, and a 256-bit key must all be present before any
/// operation runs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Location of the backing repository.
    pub store: GitHubConfig,
    /// 64-hex-character (256-bit) document encryption key.
    pub encryption_key: String,
    /// How long a cached shard stays servable.
    pub cache_ttl: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            store: GitHubConfig::default(),
            encryption_key: String::new(),
            cache_ttl: ekko_store::DEFAULT_TTL,
        }
    }
}

impl CoreConfig {
    /// Check that every required field is usable.
    pub fn validate(&self) -> CoreResult<()> {
        if self.store.owner.is_empty() || self.store.repo.is_empty() {
            return Err(CoreError::Config("store owner and repo are required".into()));
        }
        if self.store.token.is_empty() {
            return Err(CoreError::Config("store token is required".into()));
        }
        EncryptionKey::from_hex(&self.encryption_key)
            .map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(())
    }

    /// Parse the configured key.
    pub(crate) fn key(&self) -> CoreResult<EncryptionKey> {
        EncryptionKey::from_hex(&self.encryption_key)
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("store", &self.store)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}
