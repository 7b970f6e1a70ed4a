use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Generate the `<millis>_<suffix>` tail shared by allocated ids.
///
/// The millisecond component is zero-padded to 13 digits so that the
/// lexicographic order of ids matches their allocation order. The random
/// 16-bit suffix breaks ties between allocations landing in the same
/// millisecond.
fn time_ordered_tail(now_ms: u64) -> String {
    let mut buf = [0u8; 2];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    format!("{now_ms:013}_{:04x}", u16::from_be_bytes(buf))
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw id string as received on the wire.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The raw id string.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the id string is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// Identifier of a registered user (`u_<millis>_<suffix>`).
    UserId
);

string_id!(
    /// Identifier of a content post (`c_<millis>_<suffix>`).
    ///
    /// Content ids are time-ordered: a post created later always compares
    /// greater than one created earlier, which the trending tie-break
    /// relies on.
    ContentId
);

string_id!(
    /// Identifier of an audio track. Assigned by the uploader pipeline,
    /// not allocated here.
    AudioId
);

impl UserId {
    /// Allocate a fresh time-ordered user id.
    pub fn allocate(now_ms: u64) -> Self {
        Self(format!("u_{}", time_ordered_tail(now_ms)))
    }
}

impl ContentId {
    /// Allocate a fresh time-ordered content id.
    pub fn allocate(now_ms: u64) -> Self {
        Self(format!("c_{}", time_ordered_tail(now_ms)))
    }
}
