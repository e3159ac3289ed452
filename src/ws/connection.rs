//! WebSocket Connection Management - Reader and writer halves of one socket

use crate::core::{AppState, AuthUser};
use crate::dtos::{ClientEvent, ServerEvent};
use crate::ws::event_handlers::{Session, process_event};
use crate::ws::rooms::Room;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

#[instrument(skip(ws, state, user), fields(user_id = %user.user_id, role = %user.role))]
pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>, user: AuthUser) {
    info!("WebSocket connection established");

    let (ws_tx, ws_rx) = ws.split();
    let connection_id = Uuid::new_v4();

    // the writer drains this queue, the registry holds the only sender
    let (int_tx, int_rx) = unbounded_channel::<Arc<ServerEvent>>();
    state.rooms.register(connection_id, int_tx);
    state.rooms.join(Room::user(&user.user_id), connection_id);

    let writer = tokio::spawn(write_ws(ws_tx, int_rx));

    let mut session = Session::new(connection_id, user.user_id, user.role);
    listen_ws(ws_rx, &mut session, &state).await;

    // dropping the registration closes the queue and ends the writer
    state.rooms.unregister(&connection_id);
    if let Err(e) = writer.await {
        error!("Write task panicked: {:?}", e);
    }
    info!("WebSocket connection closed");
}

#[instrument(skip_all)]
pub async fn write_ws(
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<Arc<ServerEvent>>,
) {
    debug!("Write task started");

    while let Some(event) = internal_rx.recv().await {
        let json = match serde_json::to_string(event.as_ref()) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize {} event: {:?}", event.name(), e);
                continue;
            }
        };
        if let Err(e) = websocket_tx.send(Message::Text(Utf8Bytes::from(json))).await {
            warn!("Failed to send event, closing writer: {:?}", e);
            break;
        }
    }

    let _ = websocket_tx.close().await;
    debug!("Write task terminated");
}

#[instrument(skip_all)]
pub async fn listen_ws(
    mut websocket_rx: SplitStream<WebSocket>,
    session: &mut Session,
    state: &AppState,
) {
    debug!("Listen task started");
    let idle_timeout = state.ws_idle_timeout;

    loop {
        match timeout(idle_timeout, websocket_rx.next()).await {
            Ok(Some(Ok(msg))) => match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => process_event(state, session, event).await,
                    Err(e) => {
                        warn!("Failed to deserialize event: {}", e);
                        state
                            .rooms
                            .send_to(&session.connection_id, ServerEvent::error("Invalid event"));
                    }
                },
                Message::Close(_) => {
                    info!("Close message received");
                    break;
                }
                // pings are answered by axum
                _ => {}
            },
            Ok(Some(Err(e))) => {
                warn!("WebSocket error: {:?}", e);
                break;
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(timeout_secs = idle_timeout.as_secs(), "Connection idle, closing");
                break;
            }
        }
    }

    debug!("Listen task terminated");
}
