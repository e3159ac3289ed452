//! DTOs module - Data Transfer Objects
//!
//! Wire representations used between client and server, kept apart from the
//! persisted entities.

pub mod chat;
pub mod message;
pub mod profile;
pub mod query;
pub mod ws_event;

pub use chat::{
    ChatContextDTO, ChatDTO, CreateChatDTO, CreateConversationDTO, LastMessageDTO, MarkSeenDTO,
    ParticipantDTO,
};
pub use message::{CreateMessageDTO, MessageDTO, SeenByDTO, SenderDTO, normalize_content};
pub use profile::{CreateProfileDTO, ProfileDTO};
pub use query::{MessagesQuery, WsAuthQuery};
pub use ws_event::{ChatUpdatedDTO, ChatUserDTO, ClientEvent, SendMessageDTO, ServerEvent};
