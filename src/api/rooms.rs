use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{AuthUser, CreateRoomRequest, RoomSummary, RoomView};
use crate::state::AppState;

/// Room routes
pub fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms).post(create_room))
        .route("/{room_id}/join", post(join_room))
        .route("/{room_id}/leave", post(leave_room))
        .route("/{room_id}/end", post(end_room))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub success: bool,
    pub room_closed: bool,
}

/// POST /api/v1/rooms - Create a room for a scheduled meeting
async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(request), _): WithRejection<Json<CreateRoomRequest>, AppError>,
) -> Result<(StatusCode, Json<RoomView>)> {
    let meeting_id = request
        .meeting_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("meetingId is required".to_string()))?;

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("name is required".to_string()))?;

    let view = state
        .rooms
        .create_room(meeting_id, name, &user.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/rooms - List live rooms (admin only)
async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<RoomSummary>>> {
    user.require_role(&[state.auth.admin_role()])?;
    Ok(Json(state.rooms.list_active_rooms().await))
}

/// POST /api/v1/rooms/{room_id}/join
async fn join_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomView>> {
    let view = state.rooms.join_room(&room_id, &user.user_id).await?;
    Ok(Json(view))
}

/// POST /api/v1/rooms/{room_id}/leave
async fn leave_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<LeaveResponse>> {
    let outcome = state.rooms.leave_room(&room_id, &user.user_id).await?;
    Ok(Json(LeaveResponse {
        success: true,
        room_closed: outcome.room_closed,
    }))
}

/// POST /api/v1/rooms/{room_id}/end
async fn end_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state
        .rooms
        .end_room(&room_id, &user.user_id, state.auth.is_admin(&user))
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
