//! The participant `WebSocket` endpoint.
//!
//! Each connection is assigned a fresh [`ParticipantId`] and announced to
//! the control thread. Text frames carry JSON [`ClientMessage`]s in; the
//! control thread's [`Outgoing`] traffic goes back out as JSON text frames
//! or a close frame. Undecodable frames are logged and skipped.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chaos_core::runner::{Inbound, Outgoing};
use chaos_types::{ClientMessage, ParticipantId};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade to a participant connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_participant(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let participant = ParticipantId::new();
    let (link, mut outgoing) = mpsc::unbounded_channel();
    if state
        .inbound
        .send(Inbound::Connected { participant, link })
        .await
        .is_err()
    {
        warn!("Control loop gone, refusing connection");
        return;
    }
    debug!(participant = %participant, "Participant connected");

    loop {
        tokio::select! {
            out = outgoing.recv() => {
                match out {
                    Some(Outgoing::Message(message)) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!(error = %e, "Failed to encode push");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!(participant = %participant, "Send failed, closing");
                            break;
                        }
                    }
                    Some(Outgoing::Close(reason)) => {
                        let frame = CloseFrame {
                            code: close_code::POLICY,
                            reason: reason.into(),
                        };
                        if socket.send(Message::Close(Some(frame))).await.is_err() {
                            debug!(participant = %participant, "Close frame not delivered");
                        }
                        break;
                    }
                    None => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(message) => {
                                let inbound = Inbound::Message { from: participant, message };
                                if state.inbound.send(inbound).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => debug!(participant = %participant, error = %e, "Undecodable frame"),
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(participant = %participant, error = %e, "WebSocket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!(participant = %participant, "Participant disconnected");
    if state
        .inbound
        .send(Inbound::Disconnected { participant })
        .await
        .is_err()
    {
        debug!("Control loop gone before disconnect");
    }
}
