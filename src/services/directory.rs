//! Chat directory - Conversation operations shared by REST and the realtime gateway
//!
//! Authorization is always membership of the conversation's participant list,
//! never the caller's role alone.

use crate::core::{AppState, AuthUser, ChatError};
use crate::dtos::{
    ChatDTO, CreateChatDTO, CreateConversationDTO, CreateMessageDTO, MessageDTO, ParticipantDTO,
    normalize_content,
};
use crate::entities::{Conversation, Message, SeenReceipt};
use crate::repositories::{Create, Read};
use futures_util::future::try_join_all;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Loads a conversation the caller takes part in.
/// Missing chats and foreign chats are indistinguishable to the caller.
#[instrument(skip(state))]
pub async fn conversation_for_participant(
    state: &AppState,
    chat_id: &str,
    user_id: &str,
) -> Result<Conversation, ChatError> {
    match state.chat.read(chat_id).await? {
        Some(conversation) if conversation.is_participant(user_id) => Ok(conversation),
        _ => {
            debug!("Caller is not a participant of the chat");
            Err(ChatError::NotAParticipant)
        }
    }
}

/// Conversations of `user_id`, most recently updated first, each with the
/// caller's unread count and the other participant's current profile photo.
#[instrument(skip(state))]
pub async fn list_conversations(state: &AppState, user_id: &str) -> Result<Vec<ChatDTO>, ChatError> {
    let conversations = state.chat.find_many_by_user_id(user_id).await?;
    debug!("User takes part in {} chats", conversations.len());

    let chats = try_join_all(
        conversations
            .into_iter()
            .map(|conversation| enrich_for(state, conversation, user_id)),
    )
    .await?;

    info!("Successfully retrieved {} chats", chats.len());
    Ok(chats)
}

async fn enrich_for(
    state: &AppState,
    conversation: Conversation,
    user_id: &str,
) -> Result<ChatDTO, ChatError> {
    let unread = state.msg.count_unread(conversation.chat_id(), user_id).await?;

    // only profiles still in the store; a deleted one keeps its snapshot
    let mut live_photos = Vec::new();
    for other in conversation.others(user_id) {
        if let Some(profile) = state.profiles.find(other.role, &other.user_id).await? {
            live_photos.push((other.user_id.clone(), profile.profile_photo));
        }
    }

    let mut dto = ChatDTO::from(conversation);
    for participant in dto.participants.iter_mut() {
        if let Some((_, photo)) = live_photos.iter().find(|(id, _)| *id == participant.user_id) {
            participant.profile_photo = photo.clone();
        }
    }
    dto.unread_count = Some(unread);
    Ok(dto)
}

/// Returns the conversation between the caller and the requested participant,
/// creating it on first contact.
#[instrument(skip(state, caller, request), fields(caller_id = %caller.user_id, participant_id = %request.participant_id))]
pub async fn create_or_get_conversation(
    state: &AppState,
    caller: &AuthUser,
    request: CreateChatDTO,
) -> Result<ChatDTO, ChatError> {
    request.validate()?;

    if caller.role == request.participant_role {
        warn!("Chat between two {} users refused", caller.role);
        return Err(ChatError::InvalidRoleCombination);
    }

    let target = state
        .profiles
        .find(request.participant_role, &request.participant_id)
        .await?
        .ok_or_else(|| {
            warn!("Target participant does not exist");
            ChatError::ParticipantNotFound
        })?;

    // the identity service may know users the profile store has not synced yet
    let caller_profile = state.profiles.find(caller.role, &caller.user_id).await?;
    let (caller_name, caller_photo) = match caller_profile {
        Some(profile) => (profile.name, profile.profile_photo),
        None => (caller.name.clone(), None),
    };

    let data = CreateConversationDTO {
        participants: [
            ParticipantDTO {
                user_id: caller.user_id.clone(),
                role: caller.role,
                name: caller_name,
                profile_photo: caller_photo,
            },
            ParticipantDTO {
                user_id: target.user_id,
                role: target.role,
                name: target.name,
                profile_photo: target.profile_photo,
            },
        ],
        context: request.context,
    };

    let conversation = state.chat.create_or_get(&data).await?;
    Ok(ChatDTO::from(conversation))
}

/// One page of history, see [`crate::repositories::MessageRepository::find_page`].
#[instrument(skip(state))]
pub async fn get_messages(
    state: &AppState,
    chat_id: &str,
    user_id: &str,
    page: u32,
    limit: u32,
) -> Result<Vec<MessageDTO>, ChatError> {
    conversation_for_participant(state, chat_id, user_id).await?;

    let messages = state.msg.find_page(chat_id, page, limit).await?;
    let dtos = with_seen_by(state, messages).await?;

    info!("Retrieved {} messages for chat", dtos.len());
    Ok(dtos)
}

/// Marks every message from the other participant as seen by `user_id`.
#[instrument(skip(state))]
pub async fn mark_seen(state: &AppState, chat_id: &str, user_id: &str) -> Result<u64, ChatError> {
    conversation_for_participant(state, chat_id, user_id).await?;
    Ok(state.msg.mark_seen(chat_id, user_id).await?)
}

/// Persists a message from `user_id`. The sender is the caller's participant
/// snapshot stored on the conversation, not the live profile.
///
/// Returns the conversation as updated by the send and the stored message.
#[instrument(skip(state, content))]
pub async fn send_message(
    state: &AppState,
    chat_id: &str,
    user_id: &str,
    content: &str,
) -> Result<(Conversation, MessageDTO), ChatError> {
    let mut conversation = conversation_for_participant(state, chat_id, user_id).await?;
    let content = normalize_content(content).map_err(|e| ChatError::Validation(e.to_string()))?;
    let sender = conversation
        .participant(user_id)
        .ok_or(ChatError::NotAParticipant)?;

    let message = state
        .msg
        .create(&CreateMessageDTO {
            chat_id: chat_id.to_string(),
            sender_id: sender.user_id.clone(),
            sender_role: sender.role,
            sender_name: sender.name.clone(),
            content,
        })
        .await?;

    conversation.chat.last_message_content = Some(message.content.clone());
    conversation.chat.last_message_sender_id = Some(message.sender_id.clone());
    conversation.chat.last_message_at = Some(message.created_at);
    conversation.chat.updated_at = message.created_at;

    // the sender's own receipt is written together with the message
    let own_receipt = SeenReceipt {
        message_id: message.message_id.clone(),
        user_id: message.sender_id.clone(),
        seen_at: message.created_at,
    };
    Ok((conversation, MessageDTO::new(message, vec![own_receipt])))
}

async fn with_seen_by(state: &AppState, messages: Vec<Message>) -> Result<Vec<MessageDTO>, ChatError> {
    let ids: Vec<String> = messages.iter().map(|m| m.message_id.clone()).collect();
    let mut seen = state.msg.find_seen_by(&ids).await?;

    Ok(messages
        .into_iter()
        .map(|m| {
            let receipts = seen.remove(&m.message_id).unwrap_or_default();
            MessageDTO::new(m, receipts)
        })
        .collect())
}
