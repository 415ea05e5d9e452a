use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppError, Result};
use crate::models::Room;

/// Room state guarded by the room's own lock.
#[derive(Debug)]
pub struct RoomEntry {
    pub room: Room,
    pub last_activity: Instant,
    /// Set once the room has been torn down; late lockers treat it as absent.
    pub closed: bool,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        Self {
            room,
            last_activity: Instant::now(),
            closed: false,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

type RoomHandle = Arc<Mutex<RoomEntry>>;

/// Map value: the room's lock plus its meeting id, readable without locking.
struct RoomSlot {
    meeting_id: String,
    handle: RoomHandle,
}

/// Live rooms by id. All mutation of a room happens under its lock; the map
/// itself is only used to find the lock.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, RoomSlot>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room and return it already locked, so no other request can
    /// observe it before the caller finishes setting it up.
    pub async fn insert(&self, room: Room) -> OwnedMutexGuard<RoomEntry> {
        let room_id = room.id.clone();
        let meeting_id = room.meeting_id.clone();
        let handle: RoomHandle = Arc::new(Mutex::new(RoomEntry::new(room)));
        let guard = handle.clone().lock_owned().await;
        self.rooms.insert(room_id, RoomSlot { meeting_id, handle });
        guard
    }

    /// Lock a live room, or fail `NotFound` if it is absent or already ended.
    pub async fn lock(&self, room_id: &str) -> Result<OwnedMutexGuard<RoomEntry>> {
        let handle = self
            .rooms
            .get(room_id)
            .map(|slot| slot.handle.clone())
            .ok_or_else(room_missing)?;

        let guard = handle.lock_owned().await;
        if guard.closed {
            return Err(room_missing());
        }
        Ok(guard)
    }

    /// Remove the room from the map and mark the locked entry closed.
    pub fn close(&self, entry: &mut RoomEntry) {
        entry.closed = true;
        self.rooms.remove(&entry.room.id);
    }

    /// Whether a live room other than `room_id` belongs to the meeting.
    pub fn has_other_room_for_meeting(&self, meeting_id: &str, room_id: &str) -> bool {
        self.rooms
            .iter()
            .any(|slot| slot.meeting_id == meeting_id && slot.key() != room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Snapshot of every live room handle.
    pub(crate) fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.iter().map(|slot| slot.handle.clone()).collect()
    }
}

fn room_missing() -> AppError {
    AppError::NotFound("Room does not exist or has ended".to_string())
}
