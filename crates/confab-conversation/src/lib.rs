//! # confab-conversation
//!
//! Conversation object model and decryption transform engine for the Confab
//! client SDK.
//!
//! Conversations arrive with every user-authored field encrypted under keys
//! held by the platform KMS. This crate models the heterogeneous activity
//! tree as a tagged union and walks it recursively, decrypting each field
//! through the external [`CryptoService`](confab_core::CryptoService) with
//! per-field failure isolation.

pub mod decryption;
pub mod models;
pub mod service;

pub use decryption::{ConversationConfig, DecryptStats, DecryptionEngine};
pub use models::*;
pub use service::{ConversationQueryOptions, ConversationService};
