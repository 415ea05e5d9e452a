//! Keeps the meeting record's status in step with the room lifecycle.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::meetings::MeetingStore;
use crate::models::{Meeting, MeetingStatus};

#[derive(Clone)]
pub struct MeetingLifecycle {
    store: Arc<dyn MeetingStore>,
}

impl MeetingLifecycle {
    pub fn new(store: Arc<dyn MeetingStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, meeting_id: &str) -> Result<Option<Meeting>> {
        self.store.find_by_id(meeting_id).await.map_err(internal)
    }

    /// Meeting becomes `confirmed` and points at the room's join path.
    pub async fn mark_confirmed(&self, meeting_id: &str, meeting_link: &str) -> Result<()> {
        let mut meeting = self.find(meeting_id).await?.ok_or_else(|| {
            AppError::InternalError(format!("Meeting {} disappeared before confirm", meeting_id))
        })?;

        meeting.status = MeetingStatus::Confirmed;
        meeting.meeting_link = Some(meeting_link.to_string());
        self.store.save(&meeting).await.map_err(internal)?;

        tracing::info!(meeting_id = %meeting_id, link = %meeting_link, "Meeting confirmed");
        Ok(())
    }

    /// Meeting becomes `completed`. A meeting deleted in the meantime has
    /// nothing left to complete and is skipped.
    pub async fn mark_completed(&self, meeting_id: &str) -> Result<()> {
        let Some(mut meeting) = self.find(meeting_id).await? else {
            tracing::warn!(meeting_id = %meeting_id, "Meeting missing at completion, skipping");
            return Ok(());
        };

        meeting.status = MeetingStatus::Completed;
        self.store.save(&meeting).await.map_err(internal)?;

        tracing::info!(meeting_id = %meeting_id, "Meeting completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.store.health_check().await
    }
}

fn internal(err: AppError) -> AppError {
    match err {
        AppError::InternalError(msg) => AppError::InternalError(msg),
        other => AppError::InternalError(other.to_string()),
    }
}
