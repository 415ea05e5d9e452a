use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{AppError, Result};
use crate::meetings::MeetingStore;
use crate::models::Meeting;

/// Process-local meeting store for tests and single-node development runs.
#[derive(Default)]
pub struct InMemoryMeetingStore {
    meetings: DashMap<String, Meeting>,
    fail_saves: AtomicBool,
}

impl InMemoryMeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, meeting: Meeting) {
        self.meetings.insert(meeting.id.clone(), meeting);
    }

    pub fn get(&self, meeting_id: &str) -> Option<Meeting> {
        self.meetings.get(meeting_id).map(|m| m.clone())
    }

    pub fn remove(&self, meeting_id: &str) -> Option<Meeting> {
        self.meetings.remove(meeting_id).map(|(_, m)| m)
    }

    /// Make every subsequent `save` fail until reset.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<Meeting>> {
        Ok(self.get(meeting_id))
    }

    async fn save(&self, meeting: &Meeting) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::InternalError(
                "meeting store unavailable".to_string(),
            ));
        }
        self.meetings.insert(meeting.id.clone(), meeting.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
