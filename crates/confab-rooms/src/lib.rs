//! # confab-rooms
//!
//! Room management for the Confab client SDK: CRUD over the rooms resource
//! and read-status projections computed from the decrypted conversations
//! underneath.

pub mod models;
pub mod service;

pub use models::{NewRoom, Room, RoomInfo, RoomType};
pub use service::RoomsService;
