//! Shared helpers for the integration tests
//!
//! Every test gets its own in-memory database seeded with two farmers and two
//! consumers.

#![allow(dead_code)]

use agrichat::core::{AppState, AuthUser, encode_jwt};
use agrichat::dtos::CreateProfileDTO;
use agrichat::entities::Role;
use agrichat::repositories::connect_in_memory;
use agrichat::ws::Room;
use axum_test::TestServer;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub const JWT_SECRET: &str = "integration-test-secret";

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// (user id, role, display name)
pub const PROFILES: [(&str, Role, &str); 4] = [
    ("farmer-1", Role::Farmer, "Ravi Kumar"),
    ("farmer-2", Role::Farmer, "Meena Devi"),
    ("consumer-1", Role::Consumer, "Green Bowl Cafe"),
    ("consumer-2", Role::Consumer, "City Hotel"),
];

/// Creates an AppState on a fresh in-memory database with the seeded profiles
pub async fn create_test_state() -> Arc<AppState> {
    let pool = connect_in_memory()
        .await
        .expect("Failed to open in-memory database");
    let state = AppState::new(pool, JWT_SECRET.to_string());

    for (user_id, role, name) in PROFILES {
        state
            .profiles
            .create(
                role,
                &CreateProfileDTO {
                    user_id: user_id.to_string(),
                    name: name.to_string(),
                    location: Some("Nashik".to_string()),
                    profile_photo: Some(format!("https://cdn.example/{user_id}.jpg")),
                },
            )
            .await
            .expect("Failed to seed profile");
    }

    Arc::new(state)
}

pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = agrichat::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Signed token for one of the seeded users (or any other id)
pub fn create_test_jwt(user_id: &str, role: Role) -> String {
    let user = AuthUser {
        user_id: user_id.to_string(),
        role,
        name: user_id.to_string(),
    };
    encode_jwt(&user, JWT_SECRET).expect("Failed to create JWT token")
}

pub fn bearer(user_id: &str, role: Role) -> String {
    format!("Bearer {}", create_test_jwt(user_id, role))
}

/// Serves the app on an ephemeral port, for tests that need real sockets
pub async fn spawn_app(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    let app = agrichat::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server crashed");
    });
    addr
}

pub async fn connect_ws(addr: SocketAddr, user_id: &str, role: Role) -> WsClient {
    let url = format!("ws://{addr}/ws?token={}", create_test_jwt(user_id, role));
    let (ws, _) = connect_async(url).await.expect("WebSocket handshake failed");
    ws
}

pub async fn send_event(ws: &mut WsClient, event: Value) {
    ws.send(Message::Text(event.to_string()))
        .await
        .expect("Failed to send event");
}

/// Next JSON event, skipping control frames. Panics after two seconds.
pub async fn recv_event(ws: &mut WsClient) -> Value {
    let next = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(&text).expect("Server sent invalid JSON");
                }
                Some(Ok(_)) => continue,
                other => panic!("WebSocket closed while waiting for an event: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(2), next)
        .await
        .expect("Timed out waiting for an event")
}

/// Asserts nothing arrives within a short window
pub async fn assert_no_event(ws: &mut WsClient) {
    let next = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(_)) => continue,
                _ => return None,
            }
        }
    })
    .await;
    if let Ok(Some(text)) = next {
        panic!("Unexpected event: {text}");
    }
}

/// Socket tasks register asynchronously after the handshake; wait until the
/// room has the expected number of connections.
pub async fn wait_for_room_size(state: &AppState, room: &Room, size: usize) {
    for _ in 0..100 {
        if state.rooms.room_size(room) == size {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "Room {room} never reached {size} connections (has {})",
        state.rooms.room_size(room)
    );
}
