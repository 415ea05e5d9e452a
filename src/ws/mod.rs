//! WebSocket push delivery of mailbox contents.

mod handler;

pub use handler::ws_routes;
