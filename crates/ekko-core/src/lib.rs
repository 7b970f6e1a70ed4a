//! The ekko consistency coordinator.
//!
//! The backing store offers only single-document compare-and-swap, so the
//! compound operations here (create, like, delete, suggest, and the feed
//! queries) are engineered as explicit multi-shard sequences: load every
//! shard the operation touches, mutate in memory, rescore, update the
//! indexes, then persist each touched shard in a fixed order with the
//! store's conflict-retry underneath.
//!
//! The routing layer in front of this crate dispatches already-parsed
//! argument records into [`Ekko`]'s methods and serializes the results
//! through [`ApiResponse`].

pub mod api;
pub mod config;
pub mod error;
pub mod ops;

pub use api::{
    ApiResponse, CreateContentRequest, CreateUserRequest, LikeOutcome, LikeRequest,
    RegisterAudioRequest,
};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use ops::{Ekko, SUGGEST_LIMIT};
