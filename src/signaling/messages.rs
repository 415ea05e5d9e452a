use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signaling payload. The `type` tag always matches the payload field; the
/// payload itself is carried verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Signal {
    Offer { offer: Value },
    Answer { answer: Value },
    IceCandidate { candidate: Value },
    MeetingEnded,
}

/// Message queued in a recipient's mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    #[serde(flatten)]
    pub signal: Signal,
    /// Absent for server-originated messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: String,
}

impl SignalingMessage {
    pub fn relayed(signal: Signal, from: &str, room_id: &str) -> Self {
        Self {
            signal,
            from: Some(from.to_string()),
            room_id: room_id.to_string(),
        }
    }

    pub fn meeting_ended(room_id: &str) -> Self {
        Self {
            signal: Signal::MeetingEnded,
            from: None,
            room_id: room_id.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.signal {
            Signal::Offer { .. } => "offer",
            Signal::Answer { .. } => "answer",
            Signal::IceCandidate { .. } => "ice-candidate",
            Signal::MeetingEnded => "meeting-ended",
        }
    }
}

/// Client-originated handshake message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// Name of the request field carrying this kind's payload.
    pub fn payload_field(self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "candidate",
        }
    }

    pub fn wrap(self, payload: Value) -> Signal {
        match self {
            SignalKind::Offer => Signal::Offer { offer: payload },
            SignalKind::Answer => Signal::Answer { answer: payload },
            SignalKind::IceCandidate => Signal::IceCandidate { candidate: payload },
        }
    }
}
