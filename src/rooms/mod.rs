//! Room registry, participant/session transitions and idle expiry.

pub mod ice;
pub mod manager;
pub mod reaper;
pub mod registry;

pub use ice::IceServerProvider;
pub use manager::{LeaveOutcome, RoomManager};
pub use reaper::start_room_reaper;
pub use registry::{RoomEntry, RoomRegistry};
