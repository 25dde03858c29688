//! # confab-core
//!
//! Core types, traits, and request plumbing for the Confab client SDK.
//!
//! This crate provides the REST client wrapper, the generic request batcher,
//! the encryption-service seam, and the shared wire primitives that the
//! service crates build on.

pub mod api;
pub mod batcher;
pub mod crypto;
pub mod defaults;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use api::ApiClient;
pub use batcher::{BatchHandler, Batcher, BatcherConfig, ItemDisposition};
pub use crypto::{CryptoService, ScrField, SecureContentReference};
pub use error::{Error, Result};
pub use models::ItemCollection;

#[cfg(any(test, feature = "mock"))]
pub use crypto::MockCryptoService;
