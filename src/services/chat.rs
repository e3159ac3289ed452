//! Chat services - REST handlers for the chat directory

use crate::core::{AppError, AppState, AuthUser};
use crate::dtos::{ChatDTO, CreateChatDTO, MarkSeenDTO, MessageDTO, MessagesQuery};
use crate::services::directory;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use std::sync::Arc;
use tracing::{debug, instrument};
use validator::Validate;

/// `GET /chats`
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
) -> Result<Json<Vec<ChatDTO>>, AppError> {
    debug!("Listing chats for user");
    let chats = directory::list_conversations(&state, &current_user.user_id).await?;
    Ok(Json(chats))
}

/// `POST /chats` - create-or-get
#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Json(body): Json<CreateChatDTO>,
) -> Result<Json<ChatDTO>, AppError> {
    debug!("Creating or fetching chat");
    let chat = directory::create_or_get_conversation(&state, &current_user, body).await?;
    Ok(Json(chat))
}

/// `GET /chats/{chat_id}/messages?page=&limit=`
#[instrument(skip(state, current_user, params), fields(user_id = %current_user.user_id))]
pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Query(params): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    debug!("Fetching chat messages");
    params.validate()?;

    let messages = directory::get_messages(
        &state,
        &chat_id,
        &current_user.user_id,
        params.page(),
        params.limit(),
    )
    .await?;
    Ok(Json(messages))
}

/// `PUT /chats/{chat_id}/seen`
#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_chat_seen(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<Json<MarkSeenDTO>, AppError> {
    let marked_count = directory::mark_seen(&state, &chat_id, &current_user.user_id).await?;
    Ok(Json(MarkSeenDTO {
        chat_id,
        marked_count,
    }))
}
