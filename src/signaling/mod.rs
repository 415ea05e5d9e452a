pub mod mailbox;
pub mod messages;
pub mod relay;

pub use mailbox::MailboxStore;
pub use messages::{Signal, SignalKind, SignalingMessage};
pub use relay::{RelayRequest, SignalingRelay};
