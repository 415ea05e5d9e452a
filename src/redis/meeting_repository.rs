use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::{AppError, Result};
use crate::meetings::MeetingStore;
use crate::models::Meeting;

/// Meeting repository for Redis operations
#[derive(Clone)]
pub struct RedisMeetingStore {
    pool: Pool,
}

impl RedisMeetingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn meeting_key(meeting_id: &str) -> String {
    format!("meeting:{}", meeting_id)
}

#[async_trait]
impl MeetingStore for RedisMeetingStore {
    /// Get meeting by ID
    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<Meeting>> {
        let mut conn = self.pool.get().await?;
        let json: Option<String> = conn.get(meeting_key(meeting_id)).await?;

        match json {
            Some(data) => {
                let meeting: Meeting = serde_json::from_str(&data).map_err(|e| {
                    AppError::InternalError(format!("Corrupt meeting {}: {}", meeting_id, e))
                })?;
                Ok(Some(meeting))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the stored meeting record
    async fn save(&self, meeting: &Meeting) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(meeting)
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        conn.set::<_, _, ()>(meeting_key(&meeting.id), &json).await?;

        tracing::debug!(meeting_id = %meeting.id, status = ?meeting.status, "Meeting saved");
        Ok(())
    }

    /// Check Redis connection health
    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.pool.get().await?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))?;

        Ok(pong == "PONG")
    }
}
