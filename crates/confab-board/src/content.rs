//! Board content codec.
//!
//! STRING contents round-trip their drawing JSON through text encryption;
//! FILE contents encrypt the file's SCR plus an optional JSON metadata
//! payload. Unlike conversation decryption, codec failures propagate as
//! errors: a board that cannot be decrypted is not rendered at all.

use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::warn;

use confab_core::{CryptoService, Error, Result, ScrField};

use crate::models::{BoardItem, ChannelContent, ContentType, FileData, NewContent};

/// Encrypts and decrypts channel contents under a channel's default key.
#[derive(Clone)]
pub struct ContentCodec {
    crypto: Arc<dyn CryptoService>,
    /// Stamped onto encrypted contents as the originating device type.
    pub device_type: Option<String>,
}

impl ContentCodec {
    pub fn new(crypto: Arc<dyn CryptoService>) -> Self {
        Self {
            crypto,
            device_type: None,
        }
    }

    pub fn with_device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    /// Encrypt a set of contents under the channel key, concurrently.
    pub async fn encrypt_contents(
        &self,
        encryption_key_url: &str,
        contents: Vec<NewContent>,
    ) -> Result<Vec<ChannelContent>> {
        try_join_all(
            contents
                .into_iter()
                .map(|content| self.encrypt_content(encryption_key_url, content)),
        )
        .await
    }

    /// Decrypt a set of contents, each under its own recorded key.
    pub async fn decrypt_contents(
        &self,
        contents: Vec<ChannelContent>,
    ) -> Result<Vec<BoardItem>> {
        try_join_all(
            contents
                .into_iter()
                .map(|content| self.decrypt_content(content)),
        )
        .await
    }

    async fn encrypt_content(
        &self,
        encryption_key_url: &str,
        mut content: NewContent,
    ) -> Result<ChannelContent> {
        // The presence of a file determines the content type.
        match content.file.take() {
            Some(file) => {
                self.encrypt_file_content(
                    encryption_key_url,
                    file,
                    content.display_name,
                    content.metadata,
                )
                .await
            }
            None => {
                self.encrypt_string_content(encryption_key_url, content)
                    .await
            }
        }
    }

    async fn encrypt_string_content(
        &self,
        encryption_key_url: &str,
        content: NewContent,
    ) -> Result<ChannelContent> {
        let payload = content
            .payload
            .ok_or_else(|| Error::InvalidInput("STRING content requires a payload".to_string()))?;
        let sealed = self
            .crypto
            .encrypt_text(encryption_key_url, &serde_json::to_string(&payload)?)
            .await?;

        Ok(ChannelContent {
            content_type: ContentType::String,
            device: self.device_type.clone(),
            encryption_key_url: Some(encryption_key_url.to_string()),
            payload: Some(sealed),
            ..ChannelContent::default()
        })
    }

    async fn encrypt_file_content(
        &self,
        encryption_key_url: &str,
        mut file: FileData,
        display_name: Option<String>,
        metadata: Option<Value>,
    ) -> Result<ChannelContent> {
        if let Some(ScrField::Decrypted(scr)) = &file.scr {
            let sealed = self.crypto.encrypt_scr(encryption_key_url, scr).await?;
            file.scr = Some(ScrField::Encrypted(sealed));
        }

        // The display name travels inside the encrypted metadata payload.
        let mut metadata = match metadata {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "file metadata must be a JSON object, got {other}"
                )))
            }
            None => serde_json::Map::new(),
        };
        if let Some(display_name) = display_name {
            metadata.insert("displayName".to_string(), Value::String(display_name));
        }

        let payload = if metadata.is_empty() {
            None
        } else {
            let sealed = self
                .crypto
                .encrypt_text(
                    encryption_key_url,
                    &serde_json::to_string(&Value::Object(metadata))?,
                )
                .await?;
            Some(sealed)
        };

        Ok(ChannelContent {
            content_type: ContentType::File,
            device: self.device_type.clone(),
            encryption_key_url: Some(encryption_key_url.to_string()),
            payload,
            file: Some(file),
            ..ChannelContent::default()
        })
    }

    async fn decrypt_content(&self, content: ChannelContent) -> Result<BoardItem> {
        let key = content.encryption_key_url.clone().ok_or_else(|| {
            Error::InvalidInput("channel content has no encryption key url".to_string())
        })?;

        match content.content_type {
            ContentType::String => {
                let payload = content.payload.as_deref().ok_or_else(|| {
                    Error::InvalidInput("STRING content has no payload".to_string())
                })?;
                let plaintext = self.crypto.decrypt_text(&key, payload).await?;
                let payload: Value = serde_json::from_str(&plaintext)?;

                Ok(BoardItem {
                    content_type: ContentType::String,
                    content_id: content.content_id,
                    payload: Some(payload),
                    metadata: Value::Object(serde_json::Map::new()),
                    ..BoardItem::default()
                })
            }
            ContentType::File => self.decrypt_file_content(&key, content).await,
        }
    }

    async fn decrypt_file_content(
        &self,
        key: &str,
        content: ChannelContent,
    ) -> Result<BoardItem> {
        let mut file = content.file.unwrap_or_default();
        if let Some(ciphertext) = file.scr.as_ref().and_then(|scr| scr.as_encrypted()) {
            let scr = self.crypto.decrypt_scr(key, ciphertext).await?;
            file.scr = Some(ScrField::Decrypted(scr));
        }

        let metadata_json = match content.payload.as_deref() {
            Some(payload) => self.crypto.decrypt_text(key, payload).await?,
            None => String::new(),
        };

        // A malformed metadata payload degrades to no metadata rather than
        // dropping the file.
        let metadata = match serde_json::from_str::<Value>(&metadata_json) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(_) | Err(_) => {
                if !metadata_json.is_empty() {
                    warn!("Discarding unparseable board content metadata");
                }
                Value::Object(serde_json::Map::new())
            }
        };
        let display_name = metadata
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(BoardItem {
            content_type: ContentType::File,
            content_id: content.content_id,
            file: Some(file),
            metadata,
            display_name,
            ..BoardItem::default()
        })
    }
}
