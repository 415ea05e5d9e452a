//! Store-and-forward relay for WebRTC handshake messages.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::rooms::RoomRegistry;
use crate::signaling::{MailboxStore, SignalKind, SignalingMessage};

/// Body shared by the offer, answer and ice-candidate endpoints. Only the
/// payload field matching the endpoint is read.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub room_id: Option<String>,
    pub target_user_id: Option<String>,
    pub offer: Option<serde_json::Value>,
    pub answer: Option<serde_json::Value>,
    pub candidate: Option<serde_json::Value>,
}

impl RelayRequest {
    fn take_payload(&mut self, kind: SignalKind) -> Option<serde_json::Value> {
        match kind {
            SignalKind::Offer => self.offer.take(),
            SignalKind::Answer => self.answer.take(),
            SignalKind::IceCandidate => self.candidate.take(),
        }
    }
}

pub struct SignalingRelay {
    registry: Arc<RoomRegistry>,
    mailboxes: Arc<MailboxStore>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<RoomRegistry>, mailboxes: Arc<MailboxStore>) -> Self {
        Self {
            registry,
            mailboxes,
        }
    }

    /// Queue a handshake message for a co-participant of the room.
    ///
    /// The sender's own membership is not checked here; it is established by
    /// joining. The target must currently be in the room. The payload is
    /// forwarded as-is, whatever its shape.
    pub async fn send(&self, sender_id: &str, kind: SignalKind, mut request: RelayRequest) -> Result<()> {
        let payload = request.take_payload(kind);
        let (room_id, target_user_id, payload) = match (
            non_empty(request.room_id),
            non_empty(request.target_user_id),
            payload,
        ) {
            (Some(room_id), Some(target), Some(payload)) => (room_id, target, payload),
            _ => {
                return Err(AppError::BadRequest(format!(
                    "roomId, targetUserId and {} are required",
                    kind.payload_field()
                )))
            }
        };

        let mut entry = self.registry.lock(&room_id).await?;

        if !entry.room.has_participant(&target_user_id) {
            return Err(AppError::NotFound(
                "Target user is not in this meeting".to_string(),
            ));
        }

        let signal = kind.wrap(payload);
        entry.touch();

        // Enqueued under the room lock so an end of the room cannot slip in
        // between the membership check and delivery.
        self.mailboxes.push(
            &target_user_id,
            SignalingMessage::relayed(signal, sender_id, &room_id),
        );
        Ok(())
    }

    /// Drain everything queued for the caller.
    pub fn poll(&self, user_id: &str) -> Vec<SignalingMessage> {
        self.mailboxes.drain(user_id)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
