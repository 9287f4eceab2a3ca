//! Log stream WebSocket tests against a server on an ephemeral port.

use bothost::adapters::http::{HttpServer, AUTH_TIMEOUT, CLOSE_SERVICE_RESTART, CLOSE_UNAUTHENTICATED};
use bothost::domain::models::{ServerConfig, UserId};
use bothost::logging::LogCollector;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::Dispatch;
use tracing_subscriber::layer::SubscriberExt;

const TOKEN: &str = "letmein";
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct RunningServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    logs: Dispatch,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    async fn start() -> Self {
        let collector = LogCollector::new();
        let logs = Dispatch::new(tracing_subscriber::registry().with(collector.clone()));
        let config = ServerConfig {
            log_token: Some(TOKEN.to_string()),
            ..ServerConfig::default()
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown, rx) = watch::channel(false);
        let mut signal = rx.clone();
        let server = HttpServer::new(config, UserId::parse("@bot:example.com").unwrap(), collector, rx);
        let task = tokio::spawn(server.serve_listener(listener, async move {
            let _ = signal.changed().await;
        }));

        Self {
            addr,
            shutdown,
            logs,
            task,
        }
    }

    async fn connect(&self) -> Client {
        let url = format!("ws://{}/logs", self.addr);
        let (client, _) = connect_async(url.as_str()).await.unwrap();
        client
    }

    fn log(&self, message: &str) {
        tracing::dispatcher::with_default(&self.logs, || tracing::info!(target: "bot.plugin", "{message}"));
    }
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.unwrap();
}

async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("Expected a text frame, got {other:?}"),
        }
    }
}

async fn close_code(client: &mut Client, wait: Duration) -> u16 {
    loop {
        let frame = tokio::time::timeout(wait, client.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended before a close frame")
            .unwrap();
        match frame {
            Message::Close(Some(frame)) => return u16::from(frame.code),
            Message::Close(None) => panic!("close frame without a code"),
            _ => {}
        }
    }
}

async fn authenticate(client: &mut Client) -> Vec<Value> {
    send_text(client, TOKEN).await;
    assert_eq!(next_json(client).await, serde_json::json!({ "auth_success": true }));
    let history = next_json(client).await;
    history["history"].as_array().cloned().expect("history frame")
}

#[tokio::test]
async fn test_valid_token_receives_history() {
    let server = RunningServer::start().await;
    server.log("plugin loaded");

    let mut client = server.connect().await;
    let history = authenticate(&mut client).await;

    let record = history
        .iter()
        .find(|record| record["msg"] == "plugin loaded")
        .expect("logged message in history");
    assert_eq!(record["levelname"], "INFO");
    assert_eq!(record["name"], "bot.plugin");
}

#[tokio::test]
async fn test_wrong_token_is_rejected_then_retry_succeeds() {
    let server = RunningServer::start().await;
    let mut client = server.connect().await;

    send_text(&mut client, "not-the-token").await;
    assert_eq!(next_json(&mut client).await, serde_json::json!({ "auth_success": false }));

    authenticate(&mut client).await;
}

#[tokio::test]
async fn test_live_records_follow_authentication() {
    let server = RunningServer::start().await;
    let mut client = server.connect().await;
    let history = authenticate(&mut client).await;
    assert!(history.iter().all(|record| record["msg"] != "message sent"));

    server.log("message sent");

    let record = next_json(&mut client).await;
    assert_eq!(record["msg"], "message sent");
    assert_eq!(record["levelno"], 20);
}

#[tokio::test]
async fn test_unauthenticated_connection_is_closed() {
    let server = RunningServer::start().await;
    let mut client = server.connect().await;

    let code = close_code(&mut client, AUTH_TIMEOUT + Duration::from_secs(3)).await;
    assert_eq!(code, CLOSE_UNAUTHENTICATED);
}

#[tokio::test]
async fn test_shutdown_closes_authenticated_connections() {
    let server = RunningServer::start().await;
    let mut client = server.connect().await;
    authenticate(&mut client).await;

    server.shutdown.send(true).unwrap();

    let code = close_code(&mut client, FRAME_TIMEOUT).await;
    assert_eq!(code, CLOSE_SERVICE_RESTART);

    let stopped = tokio::time::timeout(FRAME_TIMEOUT, server.task).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))));
}
