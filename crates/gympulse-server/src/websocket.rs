//! WebSocket connection handling for the player UI.
//!
//! A connection receives the current snapshot on connect and a snapshot
//! after every change, and may send intents. Connections never own timing:
//! closing one leaves the session and its clock running, and reconnecting
//! rebinds to the same session.

use crate::state::AppState;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use gympulse_core::{PlayerError, PlayerEvent, SessionPlayer};
use gympulse_types::{SessionSnapshot, WsClientMessage, WsServerMessage};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};

/// Maximum size of an incoming client message.
const MAX_MESSAGE_SIZE: usize = 4 * 1024;

pub async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Subscribe before reading the snapshot so no change falls in between.
    let mut event_rx = state.player.subscribe();

    // Replies to this client only (errors, pongs, requested snapshots).
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<WsServerMessage>(32);

    let initial: WsServerMessage = state.player.snapshot().await.into();
    ws_tx
        .send(Message::Text(serde_json::to_string(&initial)?.into()))
        .await?;
    info!(target: "gympulse::ws", "Player client connected");

    let player = state.player.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(msg) = outgoing_rx.recv() => msg,
                event = event_rx.recv() => match event_message(&player, event).await {
                    Some(msg) => msg,
                    None => break,
                },
            };

            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(_) => continue,
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                debug!(target: "gympulse::ws", "Player client send failed");
                break;
            }
        }
    });

    let player = state.player.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let text = text.as_str();
            if text.len() > MAX_MESSAGE_SIZE {
                warn!(target: "gympulse::ws", "Dropping oversized message ({} bytes)", text.len());
                continue;
            }

            let reply = match serde_json::from_str::<WsClientMessage>(text) {
                Ok(client_msg) => handle_client_message(&player, client_msg).await,
                Err(e) => Some(WsServerMessage::Error {
                    code: "bad_message".to_string(),
                    message: e.to_string(),
                }),
            };
            if let Some(reply) = reply {
                if outgoing_tx.send(reply).await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!(target: "gympulse::ws", "Player client disconnected");
    Ok(())
}

/// Translate a broadcast event for the client. `None` once the player is gone.
async fn event_message(
    player: &SessionPlayer,
    event: Result<PlayerEvent, RecvError>,
) -> Option<WsServerMessage> {
    match event {
        Ok(PlayerEvent::StateChanged(snapshot)) => Some(snapshot.into()),
        Ok(PlayerEvent::Finished(record)) => Some(WsServerMessage::Finished {
            session_id: record.session_id,
            workout_id: record.workout_id,
            duration_seconds: record.duration_seconds,
            completed: record.completed,
        }),
        Err(RecvError::Lagged(skipped)) => {
            // Snapshots are absolute, so catching up is just sending the latest.
            debug!(target: "gympulse::ws", "Client lagged by {} events, resyncing", skipped);
            Some(player.snapshot().await.into())
        }
        Err(RecvError::Closed) => None,
    }
}

/// Apply one client message. Successful intents reach the client through
/// the broadcast; only errors and direct replies are returned here.
async fn handle_client_message(player: &SessionPlayer, msg: WsClientMessage) -> Option<WsServerMessage> {
    let result: gympulse_core::Result<Option<SessionSnapshot>> = match msg {
        WsClientMessage::Ping { timestamp } => return Some(WsServerMessage::Pong { timestamp }),
        WsClientMessage::GetState => return Some(player.snapshot().await.into()),
        // A resume changes nothing and broadcasts nothing, so reply directly.
        WsClientMessage::Start {
            workout_id,
            start_index,
        } => player
            .start_session(&workout_id, start_index)
            .await
            .map(|(_, snapshot)| Some(snapshot)),
        WsClientMessage::BeginWork => player.begin_work().await.map(|_| None),
        WsClientMessage::CompleteInterval => player.complete_current_interval().await.map(|_| None),
        WsClientMessage::SkipRest => player.skip_rest().await.map(|_| None),
        WsClientMessage::EndSession => player.end_session().await.map(|_| None),
    };

    match result {
        Ok(snapshot) => snapshot.map(Into::into),
        Err(e) => Some(error_message(e)),
    }
}

fn error_message(e: PlayerError) -> WsServerMessage {
    debug!(target: "gympulse::ws", "Intent rejected: {}", e);
    WsServerMessage::Error {
        code: e.code().to_string(),
        message: e.to_string(),
    }
}
