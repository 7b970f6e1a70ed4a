//! Foundation types for the ekko storage layer.
//!
//! This crate provides the identifier, versioning, and document types used
//! throughout the ekko system. Every other ekko crate depends on
//! `ekko-types`.
//!
//! # Key Types
//!
//! - [`UserId`], [`ContentId`], [`AudioId`] — typed entity identifiers
//! - [`VersionToken`] — opaque compare-and-swap token from the blob store
//! - [`ShardDocument`] — trait binding a document schema to its remote
//!   object name and empty default
//! - The seven shard schemas: [`UsersDoc`], [`AudioDoc`], [`PostsDoc`],
//!   [`MetricsDoc`], [`RelationsDoc`], [`RankingDoc`], [`IndexesDoc`]

pub mod id;
pub mod shards;
pub mod version;

pub use id::{AudioId, ContentId, UserId};
pub use shards::{
    Audio, AudioDoc, Clip, Feeds, IndexesDoc, Metrics, MetricsDoc, Post, PostsDoc, Preferences,
    RankingDoc, RelationsDoc, ShardDocument, User, UsersDoc,
};
pub use version::VersionToken;
