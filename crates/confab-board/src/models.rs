//! Whiteboard wire models.

use serde::{Deserialize, Serialize};

use confab_core::ScrField;

/// A whiteboard channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_resource_url: Option<String>,
    /// Key under which channel contents are encrypted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_encryption_key_url: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
}

/// Client-supplied fields for a new channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewChannel {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
}

/// The conversation a channel is linked to, as needed for ACL and KMS
/// bootstrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationLink {
    pub acl_url: String,
    pub kms_resource_object_url: String,
}

/// KMS instruction piggybacked on channel lifecycle requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KmsMessage {
    pub method: String,
    pub uri: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub key_uris: Vec<String>,
}

/// Content discriminator on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Drawing data serialized to an encrypted JSON string.
    #[default]
    String,
    /// An uploaded file referenced through an SCR.
    File,
}

/// File descriptor attached to FILE contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scr: Option<ScrField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One encrypted content item as stored by the board service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelContent {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    /// Encrypted JSON: drawing data for STRING, metadata for FILE.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileData>,
}

/// One content item before encryption.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewContent {
    /// Drawing data (curves, text). Present for STRING contents.
    pub payload: Option<serde_json::Value>,
    /// File descriptor with a decrypted SCR. Presence makes this a FILE.
    pub file: Option<FileData>,
    pub display_name: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// One content item after decryption.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardItem {
    pub content_type: ContentType,
    pub content_id: Option<String>,
    /// Decrypted drawing data for STRING contents.
    pub payload: Option<serde_json::Value>,
    /// File descriptor with its SCR decrypted, for FILE contents.
    pub file: Option<FileData>,
    /// Decrypted metadata for FILE contents; empty object when the payload
    /// did not parse.
    pub metadata: serde_json::Value,
    pub display_name: Option<String>,
}
