//! Room service: CRUD glue plus the read-status listing.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;

use confab_conversation::{ConversationQueryOptions, ConversationService};
use confab_core::{defaults, ApiClient, CryptoService, Error, ItemCollection, Result};

use crate::models::{NewRoom, Room, RoomInfo};

/// Room management over the rooms resource, with read-status projections
/// computed from the underlying conversations.
#[derive(Clone)]
pub struct RoomsService {
    api: ApiClient,
    conversations: ConversationService,
}

impl RoomsService {
    /// Create a service sharing one API client between the rooms resource
    /// and the conversation reads behind the read-status listing.
    pub fn new(api: ApiClient, crypto: Arc<dyn CryptoService>) -> Self {
        let conversations = ConversationService::new(api.clone(), crypto);
        Self { api, conversations }
    }

    /// Create a service around an existing conversation service.
    pub fn with_conversations(api: ApiClient, conversations: ConversationService) -> Self {
        Self { api, conversations }
    }

    /// Create a new room. The authenticated user becomes a member.
    pub async fn create(&self, room: &NewRoom) -> Result<Room> {
        self.api.post_json("rooms", room).await
    }

    /// Fetch a single room.
    pub async fn get(&self, id: &str) -> Result<Room> {
        self.api.get_json(&format!("rooms/{id}")).await
    }

    /// List rooms the authenticated user is a member of.
    pub async fn list(&self, max: Option<u32>) -> Result<Vec<Room>> {
        let page: ItemCollection<Room> = match max {
            Some(max) => {
                self.api
                    .get_json_query("rooms", &[("max", max.to_string())])
                    .await?
            }
            None => self.api.get_json("rooms").await?,
        };
        Ok(page.items)
    }

    /// Update a room's mutable properties.
    pub async fn update(&self, room: &Room) -> Result<Room> {
        let id = room
            .id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("room has no id".to_string()))?;
        self.api.put_json(&format!("rooms/{id}"), room).await
    }

    /// Delete a room.
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.api.delete(&format!("rooms/{id}")).await
    }

    /// List rooms with read status, sorted most recent activity first.
    ///
    /// With `max_recent` of zero, every conversation (up to the service
    /// limit) is projected. A positive `max_recent` bounds the listing to
    /// that many conversations with activity inside the recent window;
    /// values above 100 are rejected.
    pub async fn list_with_read_status(&self, max_recent: u32) -> Result<Vec<RoomInfo>> {
        if max_recent > defaults::ROOMS_MAX_RECENT_LIMIT {
            return Err(Error::InvalidInput(format!(
                "max_recent must be between 0 and {}",
                defaults::ROOMS_MAX_RECENT_LIMIT
            )));
        }

        let mut options = ConversationQueryOptions {
            conversations_limit: Some(defaults::ROOMS_CONVERSATIONS_LIMIT),
            activities_limit: Some(0),
            is_active: Some(true),
            compute_title_if_empty: true,
            ..ConversationQueryOptions::default()
        };
        if max_recent > 0 {
            options.conversations_limit = Some(max_recent);
            options.since_date =
                Some(Utc::now() - Duration::days(defaults::ROOMS_RECENT_WINDOW_DAYS));
        }

        let conversations = self.conversations.list(&options).await?;
        debug!(
            conversations = conversations.len(),
            max_recent, "Building room read-status projection"
        );

        let mut rooms: Vec<RoomInfo> = conversations
            .iter()
            .map(RoomInfo::from_conversation)
            .collect();
        rooms.sort_by_key(|room| Reverse(room.last_activity_date));
        Ok(rooms)
    }

    /// Read status for a single room, fetched just in time.
    pub async fn get_with_read_status(&self, id: &str) -> Result<RoomInfo> {
        let options = ConversationQueryOptions {
            activities_limit: Some(0),
            compute_title_if_empty: true,
            ..ConversationQueryOptions::default()
        };
        let conversation = self.conversations.get(id, &options).await?;
        Ok(RoomInfo::from_conversation(&conversation))
    }
}
