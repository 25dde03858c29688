//! # confab-board
//!
//! Whiteboard channel and content management for the Confab client SDK.
//!
//! Boards are stored as channels of encrypted content items: drawing data
//! serialized to encrypted JSON strings, and uploaded images referenced
//! through encrypted SCRs. This crate provides channel CRUD and the content
//! codec over the external encryption service.

pub mod content;
pub mod models;
pub mod service;

pub use content::ContentCodec;
pub use models::{
    BoardItem, Channel, ChannelContent, ContentType, ConversationLink, FileData, KmsMessage,
    NewChannel, NewContent,
};
pub use service::{BoardConfig, BoardService};
