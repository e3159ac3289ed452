//! Services module - Chat directory and HTTP handlers
//!
//! `directory` holds the conversation operations shared with the realtime
//! gateway; the other modules are thin axum handlers on top of it.

pub mod chat;
pub mod directory;
pub mod profile;

pub use chat::{create_chat, get_chat_messages, list_chats, mark_chat_seen};
pub use profile::get_participant_profile;

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
