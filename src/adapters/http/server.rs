//! Embedded web server.
//!
//! Serves a health endpoint and, when `server.log_token` is configured, the
//! log stream WebSocket. Every route lives under `server.base_path`.

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use super::log_stream::log_websocket;
use crate::domain::models::{ServerConfig, UserId};
use crate::infrastructure::logging::LogCollector;

/// Shared state for request handlers
#[derive(Debug)]
pub struct ServerState {
    pub user_id: UserId,
    pub collector: LogCollector,
    pub log_token: Option<String>,
    /// Flips to `true` once the server is shutting down
    pub shutdown: watch::Receiver<bool>,
}

/// The bot host's web server
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<ServerState>,
}

impl HttpServer {
    pub fn new(
        config: ServerConfig,
        user_id: UserId,
        collector: LogCollector,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let state = Arc::new(ServerState {
            user_id,
            collector,
            log_token: config.log_token.clone(),
            shutdown,
        });
        Self { config, state }
    }

    /// Build the router with all endpoints under the base path
    pub fn build_router(&self) -> Router {
        let mut routes = Router::new().route("/health", get(health_check));
        if self.state.log_token.is_some() {
            routes = routes.route("/logs", get(log_websocket));
        }
        let routes = routes.with_state(self.state.clone());

        let prefix = self.config.base_path.trimmed();
        let router = if prefix.is_empty() {
            routes
        } else {
            Router::new().nest(prefix, routes)
        };
        router.layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener =
            TcpListener::bind((self.config.hostname.as_str(), self.config.port.get())).await?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_listener<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        tracing::info!(
            address = %listener.local_addr()?,
            public_url = %self.config.public_base_url(),
            log_stream = self.state.log_token.is_some(),
            "web server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    user_id: String,
    log_stream: bool,
}

async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        user_id: state.user_id.to_string(),
        log_stream: state.log_token.is_some(),
    })
}
