use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque compare-and-swap token returned by the blob store.
///
/// Every fetched object carries the token of the revision that was read;
/// a write is accepted only when the caller presents the object's current
/// token. The token's contents are backend-defined (a git blob sha for the
/// GitHub backend, a revision counter for the in-memory backend) and must
/// never be interpreted by callers.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionToken({})", self.0)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VersionToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}
