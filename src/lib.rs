pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod meetings;
pub mod models;
pub mod redis;
pub mod rooms;
pub mod signaling;
pub mod state;
pub mod ws;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
