use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::AuthUser;
use crate::state::AppState;

/// How long one push-loop wait lasts before re-arming.
const PUSH_WAIT: Duration = Duration::from_secs(30);

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    pub token: String,
}

/// WebSocket routes
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

/// WebSocket upgrade handler. Browsers cannot set headers on WebSocket
/// requests, so the token travels in the query string.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
) -> Result<Response, AppError> {
    let user: AuthUser = state.auth.validate_token(&params.token)?.into();

    tracing::info!(user_id = %user.user_id, "WebSocket upgrade request");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Push every message queued for the user until either side goes away.
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let conn_id = Uuid::new_v4().to_string();
    let user_id = user.user_id;

    tracing::info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let mailboxes = state.mailboxes.clone();
    let push_user = user_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let messages = mailboxes.wait_and_drain(&push_user, PUSH_WAIT).await;
            for msg in messages {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode signaling message");
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
        }
    });

    let recv_conn_id = conn_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::info!(conn_id = %recv_conn_id, "WebSocket close received");
                    break;
                }
                Ok(Message::Text(_)) => {
                    tracing::trace!(conn_id = %recv_conn_id, "Ignoring inbound text on push socket");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(conn_id = %recv_conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(conn_id = %conn_id, user_id = %user_id, "WebSocket disconnected");
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio_tungstenite::connect_async;

    use super::*;
    use crate::config::test_config;
    use crate::meetings::InMemoryMeetingStore;
    use crate::models::Meeting;
    use crate::signaling::{RelayRequest, SignalKind};

    async fn serve(state: AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = ws_routes().with_state(state);
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn state() -> AppState {
        let store = Arc::new(InMemoryMeetingStore::new());
        store.insert(Meeting::new("M", "T", "P", "S"));
        AppState::new(test_config(), store)
    }

    #[tokio::test]
    async fn test_rejects_invalid_token() {
        let addr = serve(state()).await;
        let result = connect_async(format!("ws://{}/ws?token=not-a-jwt", addr)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pushes_relayed_message_and_cleans_up_on_close() {
        let state = state();
        let room = state.rooms.create_room("M", "n", "T").await.unwrap();
        state.rooms.join_room(&room.id, "T").await.unwrap();
        state.rooms.join_room(&room.id, "P").await.unwrap();

        let addr = serve(state.clone()).await;
        let token = state.auth.generate_token("P", "parent").unwrap();
        let (mut socket, _) = connect_async(format!("ws://{}/ws?token={}", addr, token))
            .await
            .unwrap();

        let request = RelayRequest {
            room_id: Some(room.id.clone()),
            target_user_id: Some("P".to_string()),
            offer: Some(json!({ "sdp": "x" })),
            ..Default::default()
        };
        state.relay.send("T", SignalKind::Offer, request).await.unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let body: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({ "type": "offer", "offer": { "sdp": "x" }, "from": "T", "roomId": room.id })
        );
        assert_eq!(state.mailboxes.pending("P"), 0);

        socket.close(None).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while state.mailboxes.has_waiter("P") {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }
}
