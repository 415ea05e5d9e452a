pub mod meeting;
pub mod room;
pub mod user;

pub use meeting::{Meeting, MeetingStatus};
pub use room::{CreateRoomRequest, IceServer, Room, RoomSummary, RoomView};
pub use user::{AuthUser, Claims};
