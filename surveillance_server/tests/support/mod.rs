// Shared primitives for one-time server bootstrapping across integration tests.
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                surveillance_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the socket to accept connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

/// Connects a websocket and completes the Join handshake for the participant.
pub async fn connect_participant(base_url: &str, participant_id: u64) -> WsStream {
    let ws_url = format!("{}/ws", base_url.replace("http://", "ws://"));
    let (mut ws, _) = connect_async(&ws_url).await.expect("ws connect");

    let join = serde_json::json!({
        "type": "Join",
        "data": { "participant_id": participant_id }
    });
    ws.send(Message::Text(join.to_string().into()))
        .await
        .expect("send join");

    // The first message back is always the Identity acknowledgement.
    let identity = next_json(&mut ws).await;
    assert_eq!(identity["type"], "Identity");
    ws
}

/// Connects a websocket as an external watch-only spectator.
#[allow(dead_code)]
pub async fn connect_watch_only(base_url: &str) -> WsStream {
    let ws_url = format!("{}/ws", base_url.replace("http://", "ws://"));
    let (mut ws, _) = connect_async(&ws_url).await.expect("ws connect");

    let handshake = serde_json::json!({ "type": "WatchOnly" });
    ws.send(Message::Text(handshake.to_string().into()))
        .await
        .expect("send watch-only handshake");

    let identity = next_json(&mut ws).await;
    assert_eq!(identity["type"], "Identity");
    assert!(identity["data"]["participant_id"].is_null());
    ws
}

/// Sends one client message serialized as JSON text.
pub async fn send_json(ws: &mut WsStream, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send message");
}

/// Reads the next text frame as JSON, skipping control frames.
pub async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .expect("ws error");
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("server sent invalid json");
            }
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Reads messages until one with the given tag arrives.
pub async fn next_of_type(ws: &mut WsStream, tag: &str) -> serde_json::Value {
    for _ in 0..50 {
        let msg = next_json(ws).await;
        if msg["type"] == tag {
            return msg;
        }
    }
    panic!("no {tag} message arrived");
}
