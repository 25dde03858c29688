//! # confab-avatar
//!
//! Batched avatar URL retrieval for the Confab client SDK.
//!
//! Many UI surfaces ask for avatars for the same handful of users within a
//! few milliseconds of each other. This crate coalesces those lookups into
//! one aggregate request per debounce window and demultiplexes the response
//! back to each caller.

pub mod batcher;
pub mod service;

pub use batcher::{AvatarRequest, AvatarUrl, AvatarUrlBatcher, AvatarUrlEntry, AvatarUrlRecord};
pub use service::{AvatarConfig, AvatarService};
