//! Authenticated WebSocket feed of collected log records.
//!
//! Protocol:
//! - the client sends its token as a text frame
//! - a valid token gets `{"auth_success": true}` followed by
//!   `{"history": [...]}`, then every new record as it is logged
//! - an invalid token before authentication gets `{"auth_success": false}`
//! - connections that do not authenticate within [`AUTH_TIMEOUT`] are closed
//!   with code [`CLOSE_UNAUTHENTICATED`]; on shutdown every connection is
//!   closed with [`CLOSE_SERVICE_RESTART`]

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::server::ServerState;
use crate::infrastructure::logging::LogRecord;

/// Time a client has to send a valid token
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code for connections that never authenticated
pub const CLOSE_UNAUTHENTICATED: u16 = 4000;

/// Close code sent when the server shuts down
pub const CLOSE_SERVICE_RESTART: u16 = 1012;

/// Result of feeding one text frame to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Valid token; `first` is true when the session just became authenticated
    Accepted { first: bool },
    /// Invalid token on an unauthenticated session
    Rejected,
    /// Invalid token on an already authenticated session
    Ignored,
}

/// Authentication state of one log stream connection
#[derive(Debug)]
pub struct LogStreamSession<'a> {
    token: &'a str,
    authenticated: bool,
}

impl<'a> LogStreamSession<'a> {
    pub const fn new(token: &'a str) -> Self {
        Self {
            token,
            authenticated: false,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn on_text(&mut self, text: &str) -> AuthOutcome {
        if bool::from(text.trim().as_bytes().ct_eq(self.token.as_bytes())) {
            let first = !self.authenticated;
            self.authenticated = true;
            AuthOutcome::Accepted { first }
        } else if self.authenticated {
            AuthOutcome::Ignored
        } else {
            AuthOutcome::Rejected
        }
    }
}

/// `GET {base_path}/logs`
pub async fn log_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(mut socket: WebSocket, state: Arc<ServerState>) {
    let connection = Uuid::new_v4();
    tracing::debug!(%connection, "log stream connection opened");

    let Some(token) = state.log_token.as_deref() else {
        close(&mut socket, CLOSE_SERVICE_RESTART).await;
        return;
    };
    let mut session = LogStreamSession::new(token);
    let mut records: Option<broadcast::Receiver<LogRecord>> = None;
    let mut shutdown = state.shutdown.clone();
    let deadline = tokio::time::sleep(AUTH_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline, if !session.is_authenticated() => {
                close(&mut socket, CLOSE_UNAUTHENTICATED).await;
                tracing::debug!(%connection, "log stream connection terminated due to no authentication");
                break;
            }
            _ = shutdown.changed() => {
                close(&mut socket, CLOSE_SERVICE_RESTART).await;
                break;
            }
            record = next_record(&mut records) => match record {
                Ok(record) => {
                    if send_json(&mut socket, &record).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(%connection, missed, "log stream listener fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => match session.on_text(text.as_str()) {
                    AuthOutcome::Accepted { first } => {
                        let (history, receiver) = state.collector.snapshot_and_subscribe();
                        if send_json(&mut socket, &json!({ "auth_success": true })).await.is_err()
                            || send_json(&mut socket, &json!({ "history": history })).await.is_err()
                        {
                            break;
                        }
                        if first {
                            tracing::debug!(%connection, "log stream connection authenticated");
                            records = Some(receiver);
                        }
                    }
                    AuthOutcome::Rejected => {
                        if send_json(&mut socket, &json!({ "auth_success": false })).await.is_err() {
                            break;
                        }
                    }
                    AuthOutcome::Ignored => {}
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(%connection, error = %err, "log stream receive failed");
                    break;
                }
            },
        }
    }

    tracing::debug!(%connection, "log stream connection closed");
}

async fn next_record(
    records: &mut Option<broadcast::Receiver<LogRecord>>,
) -> Result<LogRecord, RecvError> {
    match records {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_json<T: serde::Serialize>(
    socket: &mut WebSocket,
    value: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).unwrap_or_default();
    socket.send(Message::Text(text.into())).await
}

async fn close(socket: &mut WebSocket, code: u16) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(""),
    };
    if let Err(err) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %err, "failed to send close frame");
    }
}
