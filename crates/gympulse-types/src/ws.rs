//! WebSocket message protocol between the player UI and the server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PlayerView, SessionSnapshot, SessionState};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    /// Start (or resume) a session for a workout.
    Start {
        workout_id: String,
        #[serde(default)]
        start_index: usize,
    },
    /// Leave READY and begin the first set.
    BeginWork,
    /// The current set is done ("set complete" / "stop timer").
    CompleteInterval,
    SkipRest,
    /// Terminate the session early.
    EndSession,
    /// Request the current snapshot.
    GetState,
    /// Ping for keepalive.
    Ping { timestamp: u64 },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// Snapshot of the session after any change.
    State {
        state: SessionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        view: Option<PlayerView>,
    },
    /// Sent once when a session ends, naturally or early.
    Finished {
        session_id: Uuid,
        workout_id: String,
        duration_seconds: u64,
        completed: bool,
    },
    Pong { timestamp: u64 },
    Error { code: String, message: String },
}

impl From<SessionSnapshot> for WsServerMessage {
    fn from(snapshot: SessionSnapshot) -> Self {
        WsServerMessage::State {
            state: snapshot.state,
            view: snapshot.view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: WsClientMessage = serde_json::from_str(r#"{"type":"skip_rest"}"#).unwrap();
        assert!(matches!(msg, WsClientMessage::SkipRest));

        let msg: WsClientMessage =
            serde_json::from_str(r#"{"type":"start","workout_id":"12"}"#).unwrap();
        match msg {
            WsClientMessage::Start {
                workout_id,
                start_index,
            } => {
                assert_eq!(workout_id, "12");
                assert_eq!(start_index, 0);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_server_error_shape() {
        let msg = WsServerMessage::Error {
            code: "not_playable".into(),
            message: "workout w1 has no exercises".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "not_playable");
    }
}
