//! `WebSocket` handler for live job status.
//!
//! Clients connect to `GET /ws/jobs` and receive a JSON-encoded
//! [`JobStatus`](biosurvey_jobs::JobStatus) text frame for every status
//! change they may see (see [`can_view`]).
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent change.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use biosurvey_core::Principal;

use crate::auth::Caller;
use crate::jobs::can_view;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming job status changes.
///
/// # Route
///
/// `GET /ws/jobs`
pub async fn ws_jobs(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, principal))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>, principal: Principal) {
    debug!(user_id = %principal.user_id, "WebSocket client connected");

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(status) => {
                        if !can_view(&state, &principal, &status).await {
                            continue;
                        }
                        let json = match serde_json::to_string(&status) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!("Failed to serialize job status: {e}");
                                continue;
                            }
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Job status channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
