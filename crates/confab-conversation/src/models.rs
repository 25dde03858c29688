//! Conversation and activity wire models.
//!
//! An activity tree is heterogeneous: the payload of every node is
//! discriminated by its `objectType` field. [`Object`] makes that explicit
//! as a tagged union, so the decryption engine dispatches with a `match`
//! instead of building handler names from strings. Unrecognized tags land
//! on [`Object::Unknown`] and decrypt as a no-op.
//!
//! Encrypted text props keep their plaintext in place after decryption; the
//! sibling `encrypted_*` slots hold the original ciphertext when the engine
//! is configured to retain it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use confab_core::{ItemCollection, ScrField};

/// Any decryptable node of an activity tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "objectType", rename_all = "camelCase")]
pub enum Object {
    Activity(Activity),
    Conversation(Conversation),
    Comment(Comment),
    Content(Content),
    File(FileObject),
    Link(LinkObject),
    Submit(Submit),
    Reaction2(Reaction),
    Reaction2Summary(ReactionSummary),
    Reaction2SelfSummary(ReactionSummary),
    Thread(Thread),
    MeetingContainer(MeetingContainer),
    MicroappInstance(MicroappInstance),
    Event(EventObject),
    #[serde(rename = "imageURI")]
    ImageUri(ImageUri),
    TranscodedContent(TranscodedContent),
    /// Unrecognized `objectType`; carried through untouched.
    #[serde(other)]
    Unknown,
}

/// An activity: something that happened in a conversation, wrapping the
/// object it happened to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    /// The object this activity acts on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Box<Object>>,
    /// Nested child activities (threads, edits).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ActivityChild>,
}

/// Wrapper around a nested activity in `children[]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityChild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<Object>,
}

/// A conversation and its activity stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Conversation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    /// Key for the conversation avatar, distinct from the message key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_encryption_key_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Box<Object>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activities: Option<ItemCollection<Object>>,
    /// Deprecated predecessor of `previous_value`; still decrypted for
    /// consumers reading cached conversations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<ConversationRevision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<ConversationRevision>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_readable_activity_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_relevant_activity_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_activity_date: Option<DateTime<Utc>>,
}

/// Snapshot of conversation naming before a rename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationRevision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
}

/// A text message, optionally carrying adaptive cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,
    /// Card payloads, each an independently encrypted string.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<String>,
}

/// Shared content: comment fields plus attached files and/or links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    /// `"links"` routes to link decryption, anything else to files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<ItemCollection<Object>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ItemCollection<Object>>,
}

/// An uploaded file and its derived renditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_content: Option<String>,
    /// Images are keyed with their own url rather than the activity's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scr: Option<ScrField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcoded_collection: Option<ItemCollection<Object>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Thumbnail reference on a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scr: Option<ScrField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// A shared hyperlink with its secure link reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sslr: Option<ScrField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A card action submission. `inputs` arrives as an encrypted string and
/// decrypts to a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Submit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
}

/// A single reaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
}

/// Aggregated reactions for an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionSummary {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
}

/// A thread: a flat list of child activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thread {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_activities: Vec<Object>,
}

/// A scheduled meeting container with recording extensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingContainer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ItemCollection<ExtensionItem>>,
}

/// One extension attached to a meeting container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionItem {
    /// Extensions are keyed independently of their container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtensionData>,
}

/// Payload of an extension item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_topic: Option<String>,
}

/// A recording microapp instance whose `model` decrypts to its state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MicroappInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_model: Option<String>,
}

/// A calendar event reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_display_name: Option<String>,
    /// Only decrypted when it looks like an encrypted locator
    /// (exactly five dot-separated segments).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_location: Option<String>,
}

/// An encrypted image locator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageUri {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_location: Option<String>,
}

/// Transcoded renditions of an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscodedContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<ItemCollection<Object>>,
}
