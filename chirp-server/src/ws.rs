//! WebSocket handler: control frames in, live transcription events out.
//!
//! Each connected client gets its own receiver on the controller's event
//! channel, so a slow or disconnected client never affects the others.
//! Control requests (`start_transcription`, `stop_transcription`) block on
//! session start/stop joins and therefore run under `spawn_blocking`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use chirp_core::protocol::events::{ControlAck, ControlRequest};
use chirp_core::{ChirpError, SessionConfig};

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("client connected");
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.controller.subscribe_events();

    loop {
        tokio::select! {
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let ack = handle_control_frame(&state, text.as_str()).await;
                        match serde_json::to_string(&ack) {
                            Ok(payload) => {
                                if sender.send(Message::Text(payload.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("failed to serialize control ack: {e}"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Ping/pong are answered by axum; binary frames are ignored.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("websocket receive error: {e}");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        match serde_json::to_string(&event) {
                            Ok(payload) => {
                                if sender.send(Message::Text(payload.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("failed to serialize live event: {e}"),
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!("event receiver lagged by {n} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("client disconnected");
}

async fn handle_control_frame(state: &AppState, raw: &str) -> ControlAck {
    let request: ControlRequest = match serde_json::from_str(raw) {
        Ok(request) => request,
        Err(e) => {
            return ControlAck::Error {
                message: format!("malformed control frame: {e}"),
            }
        }
    };

    match request {
        ControlRequest::StartTranscription(payload) => {
            let config = SessionConfig::from_start_payload(
                &payload,
                state.settings.overlap,
                state.settings.echo_to_console,
            );
            let controller = Arc::clone(&state.controller);
            // start() joins any previous session's worker — keep the
            // blocking wait off the async executor.
            match tokio::task::spawn_blocking(move || controller.start(config)).await {
                Ok(Ok(session_id)) => ControlAck::Started { session_id },
                Ok(Err(e)) => ControlAck::Error {
                    message: e.to_string(),
                },
                Err(e) => ControlAck::Error {
                    message: format!("start task failed: {e}"),
                },
            }
        }
        ControlRequest::StopTranscription => {
            let controller = Arc::clone(&state.controller);
            match tokio::task::spawn_blocking(move || controller.stop()).await {
                Ok(Ok(())) => ControlAck::Stopped,
                Ok(Err(ChirpError::NotRunning)) => ControlAck::NoSession,
                Ok(Err(e)) => ControlAck::Error {
                    message: e.to_string(),
                },
                Err(e) => ControlAck::Error {
                    message: format!("stop task failed: {e}"),
                },
            }
        }
    }
}
