use serde::{Deserialize, Serialize};

/// Lifecycle status of a scheduled meeting record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Pending,
    Confirmed,
    Completed,
}

/// Scheduled teacher/parent/student meeting, owned by the Meeting Store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub teacher_id: String,
    pub parent_id: String,
    pub student_id: String,
    pub status: MeetingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_link: Option<String>,
}

impl Meeting {
    pub fn new(id: &str, teacher_id: &str, parent_id: &str, student_id: &str) -> Self {
        Self {
            id: id.to_string(),
            teacher_id: teacher_id.to_string(),
            parent_id: parent_id.to_string(),
            student_id: student_id.to_string(),
            status: MeetingStatus::Pending,
            meeting_link: None,
        }
    }

    /// True if `user_id` is the teacher, parent or student of this meeting.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.teacher_id == user_id || self.parent_id == user_id || self.student_id == user_id
    }
}
