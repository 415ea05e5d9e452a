//! Background sweep that ends rooms nobody has touched for a while.
//!
//! Stops when the cancellation token fires, after finishing the current sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::rooms::RoomManager;

pub async fn start_room_reaper(
    manager: Arc<RoomManager>,
    idle_timeout: Duration,
    sweep_interval: Duration,
    cancel_token: CancellationToken,
) {
    info!(
        idle_timeout_secs = idle_timeout.as_secs(),
        sweep_interval_secs = sweep_interval.as_secs(),
        "Room reaper started"
    );

    let mut interval = tokio::time::interval(sweep_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let reaped = manager.reap_idle_rooms(idle_timeout).await;
                if reaped > 0 {
                    info!(reaped, "Reaped idle rooms");
                } else {
                    debug!("No idle rooms");
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Room reaper received shutdown signal, exiting");
                break;
            }
        }
    }
}
