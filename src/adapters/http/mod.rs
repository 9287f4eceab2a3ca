//! HTTP adapter: health endpoint and log stream WebSocket.

pub mod log_stream;
pub mod server;

pub use log_stream::{AuthOutcome, LogStreamSession, AUTH_TIMEOUT, CLOSE_SERVICE_RESTART, CLOSE_UNAUTHENTICATED};
pub use server::{HttpServer, ServerState};
