use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::AuthUser;
use crate::signaling::{RelayRequest, SignalKind, SignalingMessage};
use crate::state::AppState;

/// Signaling routes
pub fn signaling_routes() -> Router<AppState> {
    Router::new()
        .route("/offer", post(send_offer))
        .route("/answer", post(send_answer))
        .route("/ice-candidate", post(send_ice_candidate))
        .route("/messages", get(poll_messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    /// Long-poll: wait up to this long for the first message.
    pub wait_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub messages: Vec<SignalingMessage>,
}

async fn relay(
    state: &AppState,
    user: &AuthUser,
    kind: SignalKind,
    request: RelayRequest,
) -> Result<Json<serde_json::Value>> {
    state.relay.send(&user.user_id, kind, request).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /api/v1/signaling/offer
async fn send_offer(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(request), _): WithRejection<Json<RelayRequest>, AppError>,
) -> Result<Json<serde_json::Value>> {
    relay(&state, &user, SignalKind::Offer, request).await
}

/// POST /api/v1/signaling/answer
async fn send_answer(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(request), _): WithRejection<Json<RelayRequest>, AppError>,
) -> Result<Json<serde_json::Value>> {
    relay(&state, &user, SignalKind::Answer, request).await
}

/// POST /api/v1/signaling/ice-candidate
async fn send_ice_candidate(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(request), _): WithRejection<Json<RelayRequest>, AppError>,
) -> Result<Json<serde_json::Value>> {
    relay(&state, &user, SignalKind::IceCandidate, request).await
}

/// GET /api/v1/signaling/messages - drain the caller's mailbox
async fn poll_messages(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<PollQuery>, AppError>,
) -> Result<Json<PollResponse>> {
    let messages = match query.wait_ms.filter(|ms| *ms > 0) {
        Some(wait_ms) => {
            let wait = Duration::from_millis(wait_ms.min(state.config.long_poll_max_wait_ms));
            state.mailboxes.wait_and_drain(&user.user_id, wait).await
        }
        None => state.relay.poll(&user.user_id),
    };

    tracing::trace!(user_id = %user.user_id, count = messages.len(), "Messages polled");
    Ok(Json(PollResponse { messages }))
}
