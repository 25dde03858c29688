//! Conversation fetch service.
//!
//! Thin orchestration over the REST API: fetch a conversation or a page of
//! conversations, then hand the payload to the decryption engine before it
//! reaches the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use confab_core::{ApiClient, CryptoService, ItemCollection, Result};

use crate::decryption::{ConversationConfig, DecryptStats, DecryptionEngine};
use crate::models::{Conversation, Object};

/// Query options for conversation reads.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationQueryOptions {
    /// Maximum conversations returned by a listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversations_limit: Option<u32>,
    /// Activities fetched per conversation (0 skips the stream).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    /// Only conversations with activity after this instant.
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub since_date: Option<DateTime<Utc>>,
    /// Ask the server to synthesize a title for unnamed conversations.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub compute_title_if_empty: bool,
}

/// Fetches conversations and decrypts them on the way in.
#[derive(Clone)]
pub struct ConversationService {
    api: ApiClient,
    engine: Arc<DecryptionEngine>,
}

impl ConversationService {
    /// Create a service with the default decryption configuration.
    pub fn new(api: ApiClient, crypto: Arc<dyn CryptoService>) -> Self {
        Self::with_config(api, crypto, ConversationConfig::default())
    }

    /// Create a service with explicit decryption configuration.
    pub fn with_config(
        api: ApiClient,
        crypto: Arc<dyn CryptoService>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            api,
            engine: Arc::new(DecryptionEngine::new(crypto, config)),
        }
    }

    /// The decryption engine backing this service.
    pub fn engine(&self) -> &DecryptionEngine {
        &self.engine
    }

    /// Fetch and decrypt a single conversation.
    pub async fn get(
        &self,
        id: &str,
        options: &ConversationQueryOptions,
    ) -> Result<Conversation> {
        let mut conversation: Conversation = self
            .api
            .get_json_query(&format!("conversations/{id}"), options)
            .await?;
        let stats = self.engine.decrypt_conversation(&mut conversation).await;
        debug!(
            conversation = id,
            decrypted = stats.decrypted,
            degraded = stats.degraded,
            "Fetched conversation"
        );
        Ok(conversation)
    }

    /// Fetch a page of conversations, decrypting each one concurrently.
    pub async fn list(&self, options: &ConversationQueryOptions) -> Result<Vec<Conversation>> {
        let page: ItemCollection<Conversation> =
            self.api.get_json_query("conversations", options).await?;
        let mut conversations = page.items;
        join_all(
            conversations
                .iter_mut()
                .map(|conversation| self.engine.decrypt_conversation(conversation)),
        )
        .await;
        Ok(conversations)
    }

    /// Decrypt an activity object delivered out of band (push events).
    pub async fn decrypt_activity_event(&self, object: &mut Object) -> DecryptStats {
        self.engine.decrypt_object(None, object).await
    }
}
