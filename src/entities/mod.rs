//! Entities module - Records persisted in the database
//!
//! Each entity maps onto a table (or, for `Conversation`, a chat row plus its participants).

pub mod chat;
pub mod enums;
pub mod message;
pub mod profile;

pub use chat::{Chat, Conversation, Participant};
pub use enums::{ContextType, Role};
pub use message::{Message, SeenReceipt};
pub use profile::Profile;
