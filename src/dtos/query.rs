//! Query DTOs - Query string parameters

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination of `GET /chats/{chat_id}/messages`. Page 1 holds the newest messages.
#[derive(Serialize, Deserialize, Debug, Default, Validate)]
pub struct MessagesQuery {
    #[serde(default)]
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl MessagesQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Query string accepted by the WebSocket upgrade
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct WsAuthQuery {
    #[serde(default)]
    pub token: Option<String>,
}
