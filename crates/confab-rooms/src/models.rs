//! Room wire models and the read-status projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use confab_conversation::Conversation;

/// Conversation tag marking a direct (1:1) space.
const TAG_ONE_ON_ONE: &str = "ONE_ON_ONE";

/// Conversation tag marking a moderated/locked space.
const TAG_LOCKED: &str = "LOCKED";

/// A room as served by the rooms resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Client-supplied fields for a new room.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRoom {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

/// Room kind, derived from conversation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Direct,
    Group,
}

impl RoomType {
    /// Derive the room kind from a conversation's tags.
    pub fn from_tags(tags: &[String]) -> Self {
        if tags.iter().any(|tag| tag == TAG_ONE_ON_ONE) {
            Self::Direct
        } else {
            Self::Group
        }
    }
}

/// Read-status projection of one room.
///
/// A room is unread when its last activity postdates the user's last
/// presence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<DateTime<Utc>>,
    pub last_seen_activity_date: DateTime<Utc>,
    pub is_locked: bool,
}

impl RoomInfo {
    /// Build the projection from a (decrypted) conversation.
    pub fn from_conversation(conversation: &Conversation) -> Self {
        let title = conversation
            .display_name
            .clone()
            .or_else(|| conversation.computed_title.clone());
        let last_activity_date = conversation
            .last_readable_activity_date
            .or(conversation.last_relevant_activity_date);
        // A room never seen sorts behind everything with a real timestamp.
        let last_seen_activity_date = conversation
            .last_seen_activity_date
            .unwrap_or(DateTime::UNIX_EPOCH);

        Self {
            id: conversation.id.clone().unwrap_or_default(),
            room_type: RoomType::from_tags(&conversation.tags),
            title,
            last_activity_date,
            last_seen_activity_date,
            is_locked: conversation.tags.iter().any(|tag| tag == TAG_LOCKED),
        }
    }

    /// Whether the room has activity the user has not seen.
    pub fn is_unread(&self) -> bool {
        self.last_activity_date
            .is_some_and(|last| last > self.last_seen_activity_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(tags: &[&str]) -> Conversation {
        Conversation {
            id: Some("c1".to_string()),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            ..Conversation::default()
        }
    }

    #[test]
    fn one_on_one_tag_makes_a_direct_room() {
        let info = RoomInfo::from_conversation(&conversation(&["ONE_ON_ONE"]));
        assert_eq!(info.room_type, RoomType::Direct);

        let info = RoomInfo::from_conversation(&conversation(&["TEAM"]));
        assert_eq!(info.room_type, RoomType::Group);
    }

    #[test]
    fn locked_tag_is_surfaced() {
        let info = RoomInfo::from_conversation(&conversation(&["LOCKED"]));
        assert!(info.is_locked);
    }

    #[test]
    fn unseen_room_defaults_to_epoch() {
        let info = RoomInfo::from_conversation(&conversation(&[]));
        assert_eq!(info.last_seen_activity_date, DateTime::UNIX_EPOCH);
        assert!(!info.is_unread(), "no activity at all is not unread");
    }

    #[test]
    fn unread_requires_activity_after_last_seen() {
        let mut convo = conversation(&[]);
        convo.last_readable_activity_date =
            Some("2026-03-01T10:00:00Z".parse().unwrap());
        convo.last_seen_activity_date = Some("2026-03-01T09:00:00Z".parse().unwrap());
        assert!(RoomInfo::from_conversation(&convo).is_unread());

        convo.last_seen_activity_date = Some("2026-03-01T11:00:00Z".parse().unwrap());
        assert!(!RoomInfo::from_conversation(&convo).is_unread());
    }

    #[test]
    fn title_falls_back_to_computed_title() {
        let mut convo = conversation(&[]);
        convo.computed_title = Some("Alice and Bob".to_string());
        assert_eq!(
            RoomInfo::from_conversation(&convo).title.as_deref(),
            Some("Alice and Bob")
        );

        convo.display_name = Some("Design".to_string());
        assert_eq!(
            RoomInfo::from_conversation(&convo).title.as_deref(),
            Some("Design")
        );
    }
}
