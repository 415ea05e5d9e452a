//! Access to the externally owned meeting records.

pub mod bridge;
pub mod memory;

pub use bridge::MeetingLifecycle;
pub use memory::InMemoryMeetingStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Meeting;

/// Persistent store of scheduled meetings.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<Meeting>>;

    async fn save(&self, meeting: &Meeting) -> Result<()>;

    async fn health_check(&self) -> Result<bool>;
}
