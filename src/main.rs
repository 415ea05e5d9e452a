use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meetroom_signaling::api;
use meetroom_signaling::config::{Config, MeetingStoreKind};
use meetroom_signaling::meetings::{InMemoryMeetingStore, MeetingStore};
use meetroom_signaling::redis::{create_pool, RedisMeetingStore};
use meetroom_signaling::rooms::start_room_reaper;
use meetroom_signaling::state::AppState;
use meetroom_signaling::ws::ws_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging; LOG_FORMAT=json switches to one JSON object per line
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let fmt_layer = if json_logs {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting MeetRoom signaling service...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        host = %config.server_host,
        port = %config.server_port,
        meeting_store = ?config.meeting_store,
        "Configuration loaded"
    );

    let meeting_store: Arc<dyn MeetingStore> = match config.meeting_store {
        MeetingStoreKind::Redis => {
            let store = RedisMeetingStore::new(create_pool(&config)?);
            match store.health_check().await {
                Ok(true) => tracing::info!("Redis connection established"),
                Ok(false) => tracing::warn!("Redis health check returned false"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to Redis");
                    // Continue anyway, might recover later
                }
            }
            Arc::new(store)
        }
        MeetingStoreKind::Memory => {
            tracing::warn!("Using in-memory meeting store; meetings are not persisted");
            Arc::new(InMemoryMeetingStore::new())
        }
    };

    let state = AppState::new(config.clone(), meeting_store);

    let cancel_token = CancellationToken::new();
    let reaper = if config.room_idle_timeout_seconds > 0 {
        Some(tokio::spawn(start_room_reaper(
            state.rooms.clone(),
            Duration::from_secs(config.room_idle_timeout_seconds),
            Duration::from_secs(config.room_reaper_interval_seconds.max(1)),
            cancel_token.clone(),
        )))
    } else {
        tracing::info!("Idle room expiry disabled");
        None
    };

    // Build router
    let app = Router::new()
        .merge(api::create_router(state.clone()))
        .merge(ws_routes().with_state(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel_token.cancel();
    if let Some(reaper) = reaper {
        let _ = reaper.await;
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Handle shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down...");
        },
    }
}
