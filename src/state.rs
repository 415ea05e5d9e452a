use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Config;
use crate::meetings::{MeetingLifecycle, MeetingStore};
use crate::rooms::{RoomManager, RoomRegistry};
use crate::signaling::{MailboxStore, SignalingRelay};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Arc<AuthService>,
    pub meetings: MeetingLifecycle,
    pub rooms: Arc<RoomManager>,
    pub relay: Arc<SignalingRelay>,
    pub mailboxes: Arc<MailboxStore>,
}

impl AppState {
    pub fn new(config: Config, meeting_store: Arc<dyn MeetingStore>) -> Self {
        let auth = AuthService::new(&config);
        let meetings = MeetingLifecycle::new(meeting_store);
        let registry = Arc::new(RoomRegistry::new());
        let mailboxes = Arc::new(MailboxStore::new());

        let rooms = RoomManager::new(&config, registry.clone(), mailboxes.clone(), meetings.clone());
        let relay = SignalingRelay::new(registry, mailboxes.clone());

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            meetings,
            rooms: Arc::new(rooms),
            relay: Arc::new(relay),
            mailboxes,
        }
    }
}
