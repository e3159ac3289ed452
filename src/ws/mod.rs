//! WebSocket Module - Realtime gateway
//!
//! - HTTP -> WebSocket upgrade, authenticated before the upgrade happens
//! - Per-connection reader and writer tasks
//! - Room registry used for fan-out
//! - Handlers for the client events

pub mod connection;
pub mod event_handlers;
pub mod rooms;

pub use connection::handle_socket;
pub use rooms::{Room, RoomRegistry};

use crate::core::auth::bearer_token;
use crate::core::{AppError, AppState, AuthUser, decode_jwt};
use crate::dtos::WsAuthQuery;
use axum::{
    extract::{Query, State, ws::WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Entry point for WebSocket upgrade requests.
///
/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// come either as `Authorization: Bearer` or as `?token=`. The header is
/// tried first; when it is absent, not a bearer token, or fails to decode,
/// the query token is tried. If neither yields a valid token the upgrade is
/// refused with 401 and no room is ever joined.
#[instrument(skip_all)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let header_token = bearer_token(&headers).ok().flatten();
    let query_token = query.token.filter(|t| !t.is_empty());

    let mut rejected = None;
    for token in header_token.iter().chain(query_token.iter()) {
        match decode_jwt(token, &state.jwt_secret) {
            Ok(data) => {
                let user = AuthUser::from(data.claims);
                return Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)));
            }
            Err(e) => rejected = Some(e),
        }
    }

    Err(match rejected {
        Some(e) => e.into(),
        None => {
            warn!("WebSocket connection without credentials");
            AppError::unauthorized("Missing authentication token")
        }
    })
}
