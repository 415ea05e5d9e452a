//! Participant and session transitions for rooms.
//!
//! Every transition of a room runs while holding that room's lock, including
//! the Meeting Store write it triggers, so requests against the same room are
//! serialized while unrelated rooms proceed in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::meetings::MeetingLifecycle;
use crate::models::{Room, RoomSummary, RoomView};
use crate::rooms::{IceServerProvider, RoomEntry, RoomRegistry};
use crate::signaling::{MailboxStore, SignalingMessage};

/// Result of a leave request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// The caller was the last participant and the room was torn down.
    pub room_closed: bool,
}

pub struct RoomManager {
    registry: Arc<RoomRegistry>,
    mailboxes: Arc<MailboxStore>,
    meetings: MeetingLifecycle,
    ice: IceServerProvider,
    /// user_id -> room_id the user is currently in
    user_rooms: DashMap<String, String>,
    join_path_prefix: String,
}

impl RoomManager {
    pub fn new(
        config: &Config,
        registry: Arc<RoomRegistry>,
        mailboxes: Arc<MailboxStore>,
        meetings: MeetingLifecycle,
    ) -> Self {
        Self {
            registry,
            mailboxes,
            meetings,
            ice: IceServerProvider::new(config),
            user_rooms: DashMap::new(),
            join_path_prefix: config.join_path_prefix.clone(),
        }
    }

    /// Open a room for a meeting the caller takes part in.
    ///
    /// The room is only kept if the meeting record was confirmed; a failed
    /// save removes it again before the error is returned.
    pub async fn create_room(&self, meeting_id: &str, name: &str, caller_id: &str) -> Result<RoomView> {
        let meeting = self
            .meetings
            .find(meeting_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Meeting not found".to_string()))?;

        if !meeting.is_participant(caller_id) {
            return Err(AppError::Unauthorized(
                "Only participants of this meeting can create a room".to_string(),
            ));
        }

        let room = Room::new(meeting_id, name.to_string(), caller_id);
        let join_path = self.join_path(&room.id);
        let mut entry = self.registry.insert(room).await;

        if let Err(e) = self.meetings.mark_confirmed(meeting_id, &join_path).await {
            tracing::error!(
                room_id = %entry.room.id,
                meeting_id = %meeting_id,
                error = %e,
                "Meeting confirm failed, rolling back room"
            );
            self.registry.close(&mut entry);
            return Err(e);
        }

        tracing::info!(
            room_id = %entry.room.id,
            meeting_id = %meeting_id,
            created_by = %caller_id,
            "Room created"
        );

        Ok(self.view(&entry.room))
    }

    /// Add the caller to the room. Joining twice is a no-op; joining a
    /// different room first leaves the one the caller was in.
    pub async fn join_room(&self, room_id: &str, caller_id: &str) -> Result<RoomView> {
        let (view, previous_room) = {
            let mut entry = self.registry.lock(room_id).await?;

            let meeting = self
                .meetings
                .find(&entry.room.meeting_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Meeting not found".to_string()))?;

            if !meeting.is_participant(caller_id) {
                return Err(AppError::Unauthorized(
                    "You are not a participant of this meeting".to_string(),
                ));
            }

            if entry.room.add_participant(caller_id) {
                tracing::info!(
                    room_id = %room_id,
                    user_id = %caller_id,
                    participants = entry.room.participants.len(),
                    "User joined room"
                );
            }
            entry.touch();

            let previous_room = self
                .user_rooms
                .insert(caller_id.to_string(), room_id.to_string())
                .filter(|prev| prev != room_id);

            (self.view(&entry.room), previous_room)
        };

        if let Some(previous_room) = previous_room {
            tracing::info!(
                user_id = %caller_id,
                from_room = %previous_room,
                to_room = %room_id,
                "User switched rooms, leaving previous room"
            );
            match self.leave_room(&previous_room, caller_id).await {
                Ok(_) | Err(AppError::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(
                        room_id = %previous_room,
                        user_id = %caller_id,
                        error = %e,
                        "Failed to leave previous room"
                    );
                }
            }
        }

        Ok(view)
    }

    /// Remove the caller from the room. When the last participant leaves the
    /// room is torn down and its meeting marked completed.
    pub async fn leave_room(&self, room_id: &str, caller_id: &str) -> Result<LeaveOutcome> {
        let mut entry = self.registry.lock(room_id).await?;

        let removed = entry.room.remove_participant(caller_id);
        self.user_rooms.remove_if(caller_id, |_, mapped| mapped == room_id);
        entry.touch();

        if !removed || !entry.room.participants.is_empty() {
            if removed {
                tracing::info!(room_id = %room_id, user_id = %caller_id, "User left room");
            }
            return Ok(LeaveOutcome { room_closed: false });
        }

        // Last participant gone: the room is dropped even if the meeting
        // update below fails, so no empty room lingers.
        self.registry.close(&mut entry);
        tracing::info!(room_id = %room_id, user_id = %caller_id, "Last participant left, room closed");

        self.complete_meeting(&entry).await?;

        Ok(LeaveOutcome { room_closed: true })
    }

    /// End the room for everyone. Only the creator or an admin may do this.
    pub async fn end_room(&self, room_id: &str, caller_id: &str, caller_is_admin: bool) -> Result<()> {
        let mut entry = self.registry.lock(room_id).await?;

        if entry.room.created_by != caller_id && !caller_is_admin {
            return Err(AppError::Unauthorized(
                "Only the room creator or an admin can end this room".to_string(),
            ));
        }

        self.meetings.mark_completed(&entry.room.meeting_id).await?;
        let notified = self.close_and_notify(&mut entry);

        tracing::info!(
            room_id = %room_id,
            ended_by = %caller_id,
            notified,
            "Room ended"
        );
        Ok(())
    }

    /// Summaries of every live room, oldest first.
    pub async fn list_active_rooms(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for handle in self.registry.handles() {
            let entry = handle.lock().await;
            if !entry.closed {
                summaries.push(RoomSummary::from(&entry.room));
            }
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// End every room idle for at least `idle_for`, as if its creator had
    /// ended it. Returns how many rooms were reaped.
    pub async fn reap_idle_rooms(&self, idle_for: Duration) -> usize {
        let mut reaped = 0;

        for handle in self.registry.handles() {
            let mut entry = handle.lock().await;
            if entry.closed || entry.last_activity.elapsed() < idle_for {
                continue;
            }

            if let Err(e) = self.complete_meeting(&entry).await {
                tracing::warn!(
                    room_id = %entry.room.id,
                    error = %e,
                    "Failed to complete meeting for idle room, retrying next sweep"
                );
                continue;
            }

            let notified = self.close_and_notify(&mut entry);
            tracing::info!(room_id = %entry.room.id, notified, "Idle room reaped");
            reaped += 1;
        }

        reaped
    }

    /// Room the user is currently mapped into, if any.
    pub fn current_room(&self, user_id: &str) -> Option<String> {
        self.user_rooms.get(user_id).map(|r| r.clone())
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Mark the room's meeting completed after the room goes away on its own.
    /// Skipped while another room of the same meeting is live, since that
    /// room's confirm is the current state of the meeting.
    async fn complete_meeting(&self, entry: &RoomEntry) -> Result<()> {
        let meeting_id = &entry.room.meeting_id;
        if self.registry.has_other_room_for_meeting(meeting_id, &entry.room.id) {
            tracing::info!(
                room_id = %entry.room.id,
                meeting_id = %meeting_id,
                "Meeting still has a live room, leaving it confirmed"
            );
            return Ok(());
        }
        self.meetings.mark_completed(meeting_id).await
    }

    /// Tell every participant the meeting ended, unmap them and drop the room.
    fn close_and_notify(&self, entry: &mut RoomEntry) -> usize {
        let room_id = entry.room.id.clone();
        for participant in &entry.room.participants {
            self.mailboxes
                .push(participant, SignalingMessage::meeting_ended(&room_id));
            self.user_rooms
                .remove_if(participant, |_, mapped| *mapped == room_id);
        }
        self.registry.close(entry);
        entry.room.participants.len()
    }

    fn join_path(&self, room_id: &str) -> String {
        format!("{}/{}", self.join_path_prefix.trim_end_matches('/'), room_id)
    }

    fn view(&self, room: &Room) -> RoomView {
        RoomView {
            id: room.id.clone(),
            name: room.name.clone(),
            meeting_id: room.meeting_id.clone(),
            join_path: self.join_path(&room.id),
            ice_servers: self.ice.for_room(&room.id),
            participants: room.participants.clone(),
            created_at: room.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::meetings::InMemoryMeetingStore;
    use crate::models::{Meeting, MeetingStatus};
    use crate::signaling::Signal;
    use pretty_assertions::assert_eq;

    struct Fixture {
        store: Arc<InMemoryMeetingStore>,
        mailboxes: Arc<MailboxStore>,
        manager: RoomManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryMeetingStore::new());
        store.insert(Meeting::new("m1", "teacher", "parent", "student"));
        let mailboxes = Arc::new(MailboxStore::new());
        let manager = RoomManager::new(
            &test_config(),
            Arc::new(RoomRegistry::new()),
            mailboxes.clone(),
            MeetingLifecycle::new(store.clone()),
        );
        Fixture {
            store,
            mailboxes,
            manager,
        }
    }

    #[tokio::test]
    async fn test_create_room_confirms_meeting() {
        let f = fixture();
        let view = f.manager.create_room("m1", "Math review", "teacher").await.unwrap();

        assert!(view.participants.is_empty());
        assert_eq!(view.join_path, format!("/meeting-room/{}", view.id));
        assert!(f.manager.registry().contains(&view.id));

        let meeting = f.store.get("m1").unwrap();
        assert_eq!(meeting.status, MeetingStatus::Confirmed);
        assert_eq!(meeting.meeting_link, Some(view.join_path.clone()));
    }

    #[tokio::test]
    async fn test_create_room_errors() {
        let f = fixture();
        assert!(matches!(
            f.manager.create_room("missing", "x", "teacher").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.manager.create_room("m1", "x", "stranger").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(f.manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_create_room_rolls_back_on_save_failure() {
        let f = fixture();
        f.store.set_fail_saves(true);

        let err = f.manager.create_room("m1", "x", "teacher").await.unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
        assert!(f.manager.registry().is_empty());
        assert_eq!(f.store.get("m1").unwrap().status, MeetingStatus::Pending);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();

        f.manager.join_room(&room.id, "teacher").await.unwrap();
        let view = f.manager.join_room(&room.id, "teacher").await.unwrap();
        assert_eq!(view.participants, vec!["teacher".to_string()]);

        let view = f.manager.join_room(&room.id, "parent").await.unwrap();
        assert_eq!(view.participants, vec!["teacher".to_string(), "parent".to_string()]);
        assert_eq!(f.manager.current_room("parent"), Some(room.id.clone()));
    }

    #[tokio::test]
    async fn test_join_errors() {
        let f = fixture();
        assert!(matches!(
            f.manager.join_room("nope", "teacher").await,
            Err(AppError::NotFound(_))
        ));

        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        assert!(matches!(
            f.manager.join_room(&room.id, "stranger").await,
            Err(AppError::Unauthorized(_))
        ));

        f.store.remove("m1");
        assert!(matches!(
            f.manager.join_room(&room.id, "teacher").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_leave_last_participant_tears_down() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        f.manager.join_room(&room.id, "teacher").await.unwrap();
        f.manager.join_room(&room.id, "parent").await.unwrap();

        let outcome = f.manager.leave_room(&room.id, "teacher").await.unwrap();
        assert!(!outcome.room_closed);
        assert!(f.manager.registry().contains(&room.id));
        assert_eq!(f.manager.current_room("teacher"), None);

        let outcome = f.manager.leave_room(&room.id, "parent").await.unwrap();
        assert!(outcome.room_closed);
        assert!(!f.manager.registry().contains(&room.id));
        assert_eq!(f.store.get("m1").unwrap().status, MeetingStatus::Completed);

        assert!(matches!(
            f.manager.leave_room(&room.id, "parent").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_leave_by_non_member_keeps_fresh_room() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();

        let outcome = f.manager.leave_room(&room.id, "student").await.unwrap();
        assert!(!outcome.room_closed);
        assert!(f.manager.registry().contains(&room.id));
    }

    #[tokio::test]
    async fn test_concurrent_last_leaves_close_exactly_once() {
        let f = Arc::new(fixture());
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        f.manager.join_room(&room.id, "teacher").await.unwrap();
        f.manager.join_room(&room.id, "parent").await.unwrap();

        let a = {
            let f = f.clone();
            let id = room.id.clone();
            tokio::spawn(async move { f.manager.leave_room(&id, "teacher").await })
        };
        let b = {
            let f = f.clone();
            let id = room.id.clone();
            tokio::spawn(async move { f.manager.leave_room(&id, "parent").await })
        };

        let closed: Vec<bool> = vec![a.await.unwrap(), b.await.unwrap()]
            .into_iter()
            .map(|r| r.unwrap().room_closed)
            .collect();
        assert_eq!(closed.iter().filter(|c| **c).count(), 1);
        assert!(!f.manager.registry().contains(&room.id));
    }

    #[tokio::test]
    async fn test_end_room_notifies_every_participant_once() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        for id in ["teacher", "parent", "student"] {
            f.manager.join_room(&room.id, id).await.unwrap();
        }

        f.manager.end_room(&room.id, "teacher", false).await.unwrap();

        assert!(!f.manager.registry().contains(&room.id));
        assert_eq!(f.store.get("m1").unwrap().status, MeetingStatus::Completed);
        for id in ["teacher", "parent", "student"] {
            let messages = f.mailboxes.drain(id);
            assert_eq!(messages, vec![SignalingMessage::meeting_ended(&room.id)]);
            assert_eq!(messages[0].signal, Signal::MeetingEnded);
            assert_eq!(f.manager.current_room(id), None);
        }
    }

    #[tokio::test]
    async fn test_end_room_requires_creator_or_admin() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        f.manager.join_room(&room.id, "student").await.unwrap();

        let err = f
            .manager
            .end_room(&room.id, "student", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(f.manager.registry().contains(&room.id));

        f.manager.end_room(&room.id, "ops", true).await.unwrap();
        assert!(!f.manager.registry().contains(&room.id));
    }

    #[tokio::test]
    async fn test_end_room_save_failure_keeps_room() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        f.manager.join_room(&room.id, "teacher").await.unwrap();
        f.store.set_fail_saves(true);

        let err = f
            .manager
            .end_room(&room.id, "teacher", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
        assert!(f.manager.registry().contains(&room.id));
        assert!(f.mailboxes.drain("teacher").is_empty());
    }

    #[tokio::test]
    async fn test_switching_rooms_leaves_previous() {
        let f = fixture();
        f.store.insert(Meeting::new("m2", "teacher", "parent2", "student2"));
        let first = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        let second = f.manager.create_room("m2", "y", "teacher").await.unwrap();

        f.manager.join_room(&first.id, "parent").await.unwrap();
        f.manager.join_room(&first.id, "teacher").await.unwrap();
        f.manager.join_room(&second.id, "teacher").await.unwrap();

        assert_eq!(f.manager.current_room("teacher"), Some(second.id.clone()));
        let rooms = f.manager.list_active_rooms().await;
        let first_summary = rooms.iter().find(|r| r.id == first.id).unwrap();
        assert_eq!(first_summary.participant_count, 1);
    }

    #[tokio::test]
    async fn test_switching_to_new_room_of_same_meeting_keeps_it_confirmed() {
        let f = fixture();
        let first = f.manager.create_room("m1", "a", "teacher").await.unwrap();
        f.manager.join_room(&first.id, "teacher").await.unwrap();

        let second = f.manager.create_room("m1", "b", "teacher").await.unwrap();
        f.manager.join_room(&second.id, "teacher").await.unwrap();

        assert!(!f.manager.registry().contains(&first.id));
        assert!(f.manager.registry().contains(&second.id));
        assert_eq!(f.manager.current_room("teacher"), Some(second.id.clone()));

        let meeting = f.store.get("m1").unwrap();
        assert_eq!(meeting.status, MeetingStatus::Confirmed);
        assert_eq!(meeting.meeting_link, Some(second.join_path.clone()));

        // The last live room of the meeting still completes it.
        let outcome = f.manager.leave_room(&second.id, "teacher").await.unwrap();
        assert!(outcome.room_closed);
        assert_eq!(f.store.get("m1").unwrap().status, MeetingStatus::Completed);
    }

    #[tokio::test]
    async fn test_reaping_one_of_two_rooms_keeps_meeting_confirmed() {
        let f = fixture();
        let stale = f.manager.create_room("m1", "a", "teacher").await.unwrap();
        f.manager.join_room(&stale.id, "parent").await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        let fresh = f.manager.create_room("m1", "b", "teacher").await.unwrap();

        assert_eq!(f.manager.reap_idle_rooms(Duration::from_millis(100)).await, 1);
        assert!(f.manager.registry().contains(&fresh.id));
        assert_eq!(f.store.get("m1").unwrap().status, MeetingStatus::Confirmed);
        assert_eq!(f.mailboxes.drain("parent"), vec![SignalingMessage::meeting_ended(&stale.id)]);
    }

    #[tokio::test]
    async fn test_list_active_rooms() {
        let f = fixture();
        let room = f.manager.create_room("m1", "Math review", "teacher").await.unwrap();
        f.manager.join_room(&room.id, "teacher").await.unwrap();

        let rooms = f.manager.list_active_rooms().await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, room.id);
        assert_eq!(rooms[0].name, "Math review");
        assert_eq!(rooms[0].meeting_id, "m1");
        assert_eq!(rooms[0].participant_count, 1);
    }

    #[tokio::test]
    async fn test_reap_idle_rooms() {
        let f = fixture();
        let room = f.manager.create_room("m1", "x", "teacher").await.unwrap();
        f.manager.join_room(&room.id, "parent").await.unwrap();

        assert_eq!(f.manager.reap_idle_rooms(Duration::from_secs(3600)).await, 0);
        assert!(f.manager.registry().contains(&room.id));

        assert_eq!(f.manager.reap_idle_rooms(Duration::ZERO).await, 1);
        assert!(!f.manager.registry().contains(&room.id));
        assert_eq!(f.store.get("m1").unwrap().status, MeetingStatus::Completed);
        assert_eq!(f.mailboxes.drain("parent").len(), 1);
    }
}
