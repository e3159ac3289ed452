//! AgriChat server library - exposes the main modules for the binary and the tests

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

pub use crate::core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{any, get, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    use crate::ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/chats", configure_chat_routes(state.clone()))
        // authenticates itself: the token may arrive as a query parameter
        .route("/ws", any(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Conversation directory routes, all behind JWT authentication
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use crate::services::*;

    Router::new()
        .route("/", get(list_chats).post(create_chat))
        .route("/{chat_id}/messages", get(get_chat_messages))
        .route("/{chat_id}/seen", put(mark_chat_seen))
        .route(
            "/profile/{participant_id}/{role}",
            get(get_participant_profile),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
