//! Whiteboard channel service.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use confab_core::{ApiClient, CryptoService, Error, ItemCollection, Result};

use crate::content::ContentCodec;
use crate::models::{
    BoardItem, Channel, ChannelContent, ConversationLink, KmsMessage, NewChannel, NewContent,
};

/// Configuration for the board service.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Contents per request when writing in chunks.
    pub contents_per_page_add: usize,
    /// Contents per page when reading.
    pub contents_per_page_get: usize,
    /// Device type stamped onto encrypted contents.
    pub device_type: Option<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            contents_per_page_add: confab_core::defaults::BOARD_CONTENTS_PER_PAGE_ADD,
            contents_per_page_get: confab_core::defaults::BOARD_CONTENTS_PER_PAGE_GET,
            device_type: None,
        }
    }
}

impl BoardConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CONFAB_BOARD_PAGE_ADD` | `150` | Contents per write chunk |
    /// | `CONFAB_BOARD_PAGE_GET` | `1000` | Contents per read page |
    pub fn from_env() -> Self {
        let contents_per_page_add = std::env::var("CONFAB_BOARD_PAGE_ADD")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(confab_core::defaults::BOARD_CONTENTS_PER_PAGE_ADD)
            .max(1);
        let contents_per_page_get = std::env::var("CONFAB_BOARD_PAGE_GET")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(confab_core::defaults::BOARD_CONTENTS_PER_PAGE_GET)
            .max(1);

        Self {
            contents_per_page_add,
            contents_per_page_get,
            device_type: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateChannelRequest {
    acl_url_link: String,
    kms_message: KmsMessage,
    #[serde(flatten)]
    channel: NewChannel,
}

/// Whiteboard channel CRUD plus encrypted content management.
#[derive(Clone)]
pub struct BoardService {
    api: ApiClient,
    codec: ContentCodec,
    config: BoardConfig,
}

impl BoardService {
    /// Create a service with the default configuration.
    pub fn new(api: ApiClient, crypto: Arc<dyn CryptoService>) -> Self {
        Self::with_config(api, crypto, BoardConfig::default())
    }

    /// Create a service with explicit configuration.
    pub fn with_config(
        api: ApiClient,
        crypto: Arc<dyn CryptoService>,
        config: BoardConfig,
    ) -> Self {
        let mut codec = ContentCodec::new(crypto);
        codec.device_type = config.device_type.clone();
        Self { api, codec, config }
    }

    /// Create a channel linked to a conversation. The KMS resource for the
    /// conversation is authorized on the new channel in the same request.
    pub async fn create_channel(
        &self,
        conversation: &ConversationLink,
        channel: NewChannel,
    ) -> Result<Channel> {
        let request = CreateChannelRequest {
            acl_url_link: conversation.acl_url.clone(),
            kms_message: KmsMessage {
                method: "create".to_string(),
                uri: "/resources".to_string(),
                user_ids: vec![conversation.kms_resource_object_url.clone()],
                key_uris: Vec::new(),
            },
            channel,
        };
        self.api.post_json("channels", &request).await
    }

    /// Fetch a channel.
    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel> {
        self.api.get_json(&format!("channels/{channel_id}")).await
    }

    /// List the channels linked to a conversation.
    pub async fn get_channels(
        &self,
        conversation: &ConversationLink,
        channels_limit: Option<u32>,
    ) -> Result<Vec<Channel>> {
        let mut query: Vec<(&str, String)> =
            vec![("aclUrlLink", conversation.acl_url.clone())];
        if let Some(limit) = channels_limit {
            query.push(("channelsLimit", limit.to_string()));
        }
        let page: ItemCollection<Channel> = self.api.get_json_query("channels", &query).await?;
        Ok(page.items)
    }

    /// Encrypt and store contents on a channel.
    ///
    /// Large batches are written in chunks, and chunks are submitted
    /// strictly one after another: concurrent patches to the same board
    /// race on the service side.
    pub async fn add_content(
        &self,
        channel: &Channel,
        contents: Vec<NewContent>,
    ) -> Result<Vec<ChannelContent>> {
        let channel_id = Self::channel_id(channel)?;
        let key = channel.default_encryption_key_url.as_deref().ok_or_else(|| {
            Error::InvalidInput("channel has no default encryption key url".to_string())
        })?;

        let chunk_count = contents.len().div_ceil(self.config.contents_per_page_add);
        debug!(
            channel = channel_id,
            contents = contents.len(),
            chunks = chunk_count,
            "Adding board content"
        );

        let mut created = Vec::with_capacity(contents.len());
        let mut contents = contents;
        while !contents.is_empty() {
            let rest = contents.split_off(contents.len().min(self.config.contents_per_page_add));
            let chunk = std::mem::replace(&mut contents, rest);

            let encrypted = self.codec.encrypt_contents(key, chunk).await?;
            let stored: ItemCollection<ChannelContent> = self
                .api
                .post_json(&format!("channels/{channel_id}/contents"), &encrypted)
                .await?;
            created.extend(stored.items);
        }
        Ok(created)
    }

    /// Fetch and decrypt the contents of a channel.
    pub async fn get_contents(
        &self,
        channel: &Channel,
        contents_limit: Option<u32>,
    ) -> Result<Vec<BoardItem>> {
        let channel_id = Self::channel_id(channel)?;
        let limit =
            contents_limit.unwrap_or(self.config.contents_per_page_get as u32);

        let page: ItemCollection<ChannelContent> = self
            .api
            .get_json_query(
                &format!("channels/{channel_id}/contents"),
                &[("contentsLimit", limit.to_string())],
            )
            .await?;
        self.codec.decrypt_contents(page.items).await
    }

    /// Remove every content item from a channel.
    pub async fn delete_all_content(&self, channel: &Channel) -> Result<()> {
        let channel_id = Self::channel_id(channel)?;
        self.api
            .delete(&format!("channels/{channel_id}/contents"))
            .await
    }

    /// Board service healthcheck.
    pub async fn ping(&self) -> Result<serde_json::Value> {
        self.api.get_json("ping").await
    }

    fn channel_id(channel: &Channel) -> Result<&str> {
        channel
            .channel_id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("channel has no id".to_string()))
    }
}
