//! WebSocket Event Handlers - One handler per client event
//!
//! Handlers never fail the connection: problems are reported to the calling
//! connection as an `error` event and the reader keeps going.

use crate::core::{AppState, ChatError};
use crate::dtos::{ChatUpdatedDTO, ChatUserDTO, ClientEvent, LastMessageDTO, ServerEvent};
use crate::entities::Role;
use crate::services::directory;
use crate::ws::rooms::{ConnectionId, Room};
use tracing::{debug, error, info, instrument, warn};

/// Identity and navigation state of one socket
#[derive(Debug, Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub role: Role,
    /// Chat the client last opened. Room membership may cover more chats.
    pub current_chat_id: Option<String>,
}

impl Session {
    pub fn new(connection_id: ConnectionId, user_id: String, role: Role) -> Self {
        Self {
            connection_id,
            user_id,
            role,
            current_chat_id: None,
        }
    }
}

#[instrument(skip(state, session), fields(user_id = %session.user_id, connection_id = %session.connection_id))]
pub async fn process_event(state: &AppState, session: &mut Session, event: ClientEvent) {
    match event {
        ClientEvent::JoinChat(chat_id) => join_chat(state, session, chat_id).await,
        ClientEvent::LeaveChat(chat_id) => leave_chat(state, session, &chat_id),
        ClientEvent::SendMessage(dto) => send_message(state, session, &dto.chat_id, &dto.content).await,
        ClientEvent::MarkSeen(chat_id) => mark_seen(state, session, &chat_id).await,
        ClientEvent::TypingStart(chat_id) => typing(state, session, chat_id, true),
        ClientEvent::TypingStop(chat_id) => typing(state, session, chat_id, false),
    }
}

async fn join_chat(state: &AppState, session: &mut Session, chat_id: String) {
    match directory::conversation_for_participant(state, &chat_id, &session.user_id).await {
        Ok(_) => {
            state.rooms.join(Room::chat(&chat_id), session.connection_id);
            info!(chat_id = %chat_id, "Joined chat room");
            session.current_chat_id = Some(chat_id);
        }
        // unknown and foreign chats look the same: nothing happens
        Err(ChatError::NotAParticipant) => {
            debug!(chat_id = %chat_id, "Join refused silently");
        }
        Err(e) => {
            error!(chat_id = %chat_id, "Failed to join chat: {}", e);
            reply_error(state, session, "Failed to join chat");
        }
    }
}

fn leave_chat(state: &AppState, session: &mut Session, chat_id: &str) {
    if state.rooms.leave(&Room::chat(chat_id), &session.connection_id) {
        info!(chat_id, "Left chat room");
    }
    if session.current_chat_id.as_deref() == Some(chat_id) {
        session.current_chat_id = None;
    }
}

async fn send_message(state: &AppState, session: &Session, chat_id: &str, content: &str) {
    let (conversation, message) =
        match directory::send_message(state, chat_id, &session.user_id, content).await {
            Ok(sent) => sent,
            Err(ChatError::NotAParticipant) => {
                warn!(chat_id, "Send refused for non participant");
                return reply_error(state, session, "Unauthorized");
            }
            Err(ChatError::Validation(reason)) => {
                debug!(chat_id, "Invalid message: {}", reason);
                return reply_error(state, session, "Invalid message");
            }
            Err(e) => {
                error!(chat_id, "Failed to send message: {}", e);
                return reply_error(state, session, "Failed to send message");
            }
        };

    let delivered = state
        .rooms
        .emit(&Room::chat(chat_id), ServerEvent::ReceiveMessage(message));
    debug!(delivered, "Message delivered to chat room");

    // everyone else gets a directory refresh on their personal room
    if let Some(last_message) = LastMessageDTO::from_chat(&conversation.chat) {
        for other in conversation.others(&session.user_id) {
            state.rooms.emit(
                &Room::user(&other.user_id),
                ServerEvent::ChatUpdated(ChatUpdatedDTO {
                    chat_id: chat_id.to_string(),
                    last_message: last_message.clone(),
                    updated_at: conversation.chat.updated_at,
                }),
            );
        }
    }
}

async fn mark_seen(state: &AppState, session: &Session, chat_id: &str) {
    match directory::mark_seen(state, chat_id, &session.user_id).await {
        Ok(marked) => {
            debug!(chat_id, marked, "Messages marked as seen");
            state.rooms.emit_except(
                &Room::chat(chat_id),
                &session.connection_id,
                ServerEvent::MessagesSeen(ChatUserDTO {
                    user_id: session.user_id.clone(),
                    chat_id: chat_id.to_string(),
                }),
            );
        }
        Err(ChatError::NotAParticipant) => {
            warn!(chat_id, "Mark seen refused for non participant");
            reply_error(state, session, "Unauthorized");
        }
        Err(e) => {
            error!(chat_id, "Failed to mark messages as seen: {}", e);
            reply_error(state, session, "Failed to mark messages as seen");
        }
    }
}

/// Typing indicators are best effort and only relayed for rooms this
/// connection joined, so membership was already checked on join.
fn typing(state: &AppState, session: &Session, chat_id: String, started: bool) {
    let room = Room::chat(&chat_id);
    if !state.rooms.is_member(&room, &session.connection_id) {
        debug!(chat_id = %chat_id, "Typing event for a room not joined, ignored");
        return;
    }

    let who = ChatUserDTO {
        user_id: session.user_id.clone(),
        chat_id,
    };
    let event = if started {
        ServerEvent::UserTyping(who)
    } else {
        ServerEvent::UserStoppedTyping(who)
    };
    state.rooms.emit_except(&room, &session.connection_id, event);
}

fn reply_error(state: &AppState, session: &Session, message: &str) {
    state
        .rooms
        .send_to(&session.connection_id, ServerEvent::error(message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AuthUser;
    use crate::dtos::{CreateChatDTO, CreateProfileDTO, SendMessageDTO};
    use crate::repositories::connect_in_memory;
    use std::sync::Arc;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
    use uuid::Uuid;

    struct Client {
        session: Session,
        rx: UnboundedReceiver<Arc<ServerEvent>>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push((*event).clone());
            }
            events
        }
    }

    fn connect(state: &AppState, user_id: &str, role: Role) -> Client {
        let session = Session::new(Uuid::new_v4(), user_id.to_string(), role);
        let (tx, rx) = unbounded_channel();
        state.rooms.register(session.connection_id, tx);
        state.rooms.join(Room::user(user_id), session.connection_id);
        Client { session, rx }
    }

    async fn setup() -> (AppState, String) {
        let state = AppState::new(connect_in_memory().await.unwrap(), "secret".into());
        for (role, id) in [(Role::Farmer, "f1"), (Role::Consumer, "c1"), (Role::Consumer, "c2")] {
            state
                .profiles
                .create(
                    role,
                    &CreateProfileDTO {
                        user_id: id.into(),
                        name: id.to_uppercase(),
                        location: None,
                        profile_photo: None,
                    },
                )
                .await
                .unwrap();
        }
        let caller = AuthUser {
            user_id: "c1".into(),
            role: Role::Consumer,
            name: "C1".into(),
        };
        let chat = directory::create_or_get_conversation(
            &state,
            &caller,
            CreateChatDTO {
                participant_id: "f1".into(),
                participant_role: Role::Farmer,
                context: None,
            },
        )
        .await
        .unwrap();
        (state, chat.chat_id)
    }

    fn send(chat_id: &str, content: &str) -> ClientEvent {
        ClientEvent::SendMessage(SendMessageDTO {
            chat_id: chat_id.into(),
            content: content.into(),
        })
    }

    #[tokio::test]
    async fn send_reaches_room_and_pings_absent_participant() {
        let (state, chat_id) = setup().await;
        let mut consumer = connect(&state, "c1", Role::Consumer);
        let mut farmer = connect(&state, "f1", Role::Farmer);

        process_event(&state, &mut consumer.session, ClientEvent::JoinChat(chat_id.clone())).await;
        assert_eq!(consumer.session.current_chat_id.as_deref(), Some(chat_id.as_str()));

        process_event(&state, &mut consumer.session, send(&chat_id, "Is this available?")).await;

        // sender sees its own message through the room
        match consumer.drain().as_slice() {
            [ServerEvent::ReceiveMessage(m)] => assert_eq!(m.content, "Is this available?"),
            other => panic!("unexpected events {other:?}"),
        }
        // farmer did not join, so only the lightweight ping arrives
        match farmer.drain().as_slice() {
            [ServerEvent::ChatUpdated(update)] => {
                assert_eq!(update.chat_id, chat_id);
                assert_eq!(update.last_message.content, "Is this available?");
                assert_eq!(update.last_message.sender_id, "c1");
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[tokio::test]
    async fn joined_participant_gets_message_and_ping() {
        let (state, chat_id) = setup().await;
        let mut consumer = connect(&state, "c1", Role::Consumer);
        let mut farmer = connect(&state, "f1", Role::Farmer);
        process_event(&state, &mut farmer.session, ClientEvent::JoinChat(chat_id.clone())).await;

        process_event(&state, &mut consumer.session, send(&chat_id, "hello")).await;

        let events = farmer.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ServerEvent::ReceiveMessage(_)));
        assert!(matches!(events[1], ServerEvent::ChatUpdated(_)));
        // consumer never joined the room and is the sender: nothing
        assert!(consumer.drain().is_empty());
    }

    #[tokio::test]
    async fn outsider_cannot_join_or_send() {
        let (state, chat_id) = setup().await;
        let mut outsider = connect(&state, "c2", Role::Consumer);
        let mut farmer = connect(&state, "f1", Role::Farmer);
        process_event(&state, &mut farmer.session, ClientEvent::JoinChat(chat_id.clone())).await;

        process_event(&state, &mut outsider.session, ClientEvent::JoinChat(chat_id.clone())).await;
        assert!(outsider.drain().is_empty());
        assert!(outsider.session.current_chat_id.is_none());
        assert!(!state.rooms.is_member(&Room::chat(&chat_id), &outsider.session.connection_id));

        process_event(&state, &mut outsider.session, send(&chat_id, "spam")).await;
        assert_eq!(outsider.drain(), vec![ServerEvent::error("Unauthorized")]);
        process_event(&state, &mut outsider.session, send(&chat_id, "   ")).await;
        assert_eq!(outsider.drain(), vec![ServerEvent::error("Unauthorized")]);
        assert!(farmer.drain().is_empty());
        assert!(
            directory::get_messages(&state, &chat_id, "f1", 1, 50)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn mark_seen_notifies_the_rest_of_the_room() {
        let (state, chat_id) = setup().await;
        let mut consumer = connect(&state, "c1", Role::Consumer);
        let mut farmer = connect(&state, "f1", Role::Farmer);
        process_event(&state, &mut consumer.session, ClientEvent::JoinChat(chat_id.clone())).await;
        process_event(&state, &mut farmer.session, ClientEvent::JoinChat(chat_id.clone())).await;
        process_event(&state, &mut consumer.session, send(&chat_id, "hello")).await;
        consumer.drain();
        farmer.drain();

        process_event(&state, &mut farmer.session, ClientEvent::MarkSeen(chat_id.clone())).await;

        assert_eq!(
            consumer.drain(),
            vec![ServerEvent::MessagesSeen(ChatUserDTO {
                user_id: "f1".into(),
                chat_id: chat_id.clone(),
            })]
        );
        assert!(farmer.drain().is_empty());

        let mut outsider = connect(&state, "c2", Role::Consumer);
        process_event(&state, &mut outsider.session, ClientEvent::MarkSeen(chat_id)).await;
        assert_eq!(outsider.drain(), vec![ServerEvent::error("Unauthorized")]);
    }

    #[tokio::test]
    async fn typing_goes_to_other_room_members_only() {
        let (state, chat_id) = setup().await;
        let mut consumer = connect(&state, "c1", Role::Consumer);
        let mut farmer = connect(&state, "f1", Role::Farmer);
        process_event(&state, &mut consumer.session, ClientEvent::JoinChat(chat_id.clone())).await;
        process_event(&state, &mut farmer.session, ClientEvent::JoinChat(chat_id.clone())).await;

        process_event(&state, &mut consumer.session, ClientEvent::TypingStart(chat_id.clone())).await;
        process_event(&state, &mut consumer.session, ClientEvent::TypingStop(chat_id.clone())).await;

        let who = ChatUserDTO {
            user_id: "c1".into(),
            chat_id: chat_id.clone(),
        };
        assert_eq!(
            farmer.drain(),
            vec![ServerEvent::UserTyping(who.clone()), ServerEvent::UserStoppedTyping(who)]
        );
        assert!(consumer.drain().is_empty());

        // after leaving, typing is no longer relayed
        process_event(&state, &mut consumer.session, ClientEvent::LeaveChat(chat_id.clone())).await;
        assert!(consumer.session.current_chat_id.is_none());
        process_event(&state, &mut consumer.session, ClientEvent::TypingStart(chat_id.clone())).await;
        assert!(farmer.drain().is_empty());

        // leaving twice is harmless
        process_event(&state, &mut consumer.session, ClientEvent::LeaveChat(chat_id)).await;
    }

    #[tokio::test]
    async fn blank_message_is_reported_and_not_broadcast() {
        let (state, chat_id) = setup().await;
        let mut consumer = connect(&state, "c1", Role::Consumer);
        let mut farmer = connect(&state, "f1", Role::Farmer);
        process_event(&state, &mut farmer.session, ClientEvent::JoinChat(chat_id.clone())).await;

        process_event(&state, &mut consumer.session, send(&chat_id, "  \n ")).await;

        assert_eq!(consumer.drain(), vec![ServerEvent::error("Invalid message")]);
        assert!(farmer.drain().is_empty());
    }
}
