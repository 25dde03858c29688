//! Avatar retrieval service.

use futures::future::join_all;
use tracing::debug;
use uuid::Uuid;

use confab_core::{ApiClient, Batcher, BatcherConfig, Result};

use crate::batcher::{AvatarRequest, AvatarUrl, AvatarUrlBatcher};

/// Configuration for the avatar service.
#[derive(Debug, Clone)]
pub struct AvatarConfig {
    /// Size requested when the caller does not specify one, in pixels.
    pub default_size: u32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            default_size: confab_core::defaults::AVATAR_DEFAULT_SIZE,
        }
    }
}

impl AvatarConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CONFAB_AVATAR_DEFAULT_SIZE` | `80` | Default avatar size |
    pub fn from_env() -> Self {
        let default_size = std::env::var("CONFAB_AVATAR_DEFAULT_SIZE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(confab_core::defaults::AVATAR_DEFAULT_SIZE);

        Self { default_size }
    }
}

/// Retrieves avatar URLs, transparently batching lookups issued close
/// together in time into one aggregate request.
#[derive(Clone)]
pub struct AvatarService {
    batcher: Batcher<AvatarUrlBatcher>,
    config: AvatarConfig,
}

impl AvatarService {
    /// Create a service with default batching and avatar configuration.
    pub fn new(api: ApiClient) -> Self {
        Self::with_config(api, AvatarConfig::default(), BatcherConfig::default())
    }

    /// Create a service with explicit configuration.
    pub fn with_config(api: ApiClient, config: AvatarConfig, batching: BatcherConfig) -> Self {
        Self {
            batcher: Batcher::new(AvatarUrlBatcher::new(api), batching),
            config,
        }
    }

    /// Retrieve the avatar URL for a user at the default size.
    pub async fn retrieve_avatar_url(&self, uuid: Uuid) -> Result<AvatarUrl> {
        self.retrieve_avatar_url_sized(uuid, self.config.default_size)
            .await
    }

    /// Retrieve the avatar URL for a user at a specific size.
    pub async fn retrieve_avatar_url_sized(&self, uuid: Uuid, size: u32) -> Result<AvatarUrl> {
        debug!(uuid = %uuid, size = size, "Requesting avatar url");
        self.batcher.enqueue(AvatarRequest { uuid, size }).await
    }

    /// Retrieve many avatar URLs concurrently. Lookups are merged into the
    /// same batch; each result settles independently.
    pub async fn retrieve_avatar_urls(
        &self,
        requests: Vec<AvatarRequest>,
    ) -> Vec<Result<AvatarUrl>> {
        join_all(
            requests
                .into_iter()
                .map(|request| self.batcher.enqueue(request)),
        )
        .await
    }

    /// Flush the pending batch immediately instead of waiting for the
    /// debounce window.
    pub async fn flush(&self) {
        self.batcher.flush().await;
    }
}
