use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// In-memory room backing one live session of a meeting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub meeting_id: String,
    pub created_by: String,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(meeting_id: &str, name: String, created_by: &str) -> Self {
        let created_at = Utc::now();
        // The short uuid suffix keeps ids unique for creates within the same millisecond.
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!(
                "room_{}_{}_{}",
                meeting_id,
                created_at.timestamp_millis(),
                &suffix[..8]
            ),
            name,
            meeting_id: meeting_id.to_string(),
            created_by: created_by.to_string(),
            participants: Vec::new(),
            created_at,
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Adds the participant unless already present. Returns true if inserted.
    pub fn add_participant(&mut self, user_id: &str) -> bool {
        if self.has_participant(user_id) {
            return false;
        }
        self.participants.push(user_id.to_string());
        true
    }

    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p != user_id);
        self.participants.len() != before
    }
}

/// Public view of a room returned by create and join
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub meeting_id: String,
    pub join_path: String,
    pub ice_servers: Vec<IceServer>,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Row of the admin room listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub meeting_id: String,
    pub participant_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            meeting_id: room.meeting_id.clone(),
            participant_count: room.participants.len(),
            created_at: room.created_at,
        }
    }
}

/// Request to create a room. Fields are optional so missing ones surface as 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub meeting_id: Option<String>,
    pub name: Option<String>,
}

/// ICE server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}
