//! Application State - Shared state of the application
//!
//! Holds the repositories, the realtime room registry and the settings
//! needed by both the REST handlers and the WebSocket gateway.

use crate::repositories::{ChatRepository, MessageRepository, ProfileRepository};
use crate::ws::rooms::RoomRegistry;
use sqlx::SqlitePool;
use std::time::Duration;

const DEFAULT_WS_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Global state shared by every route, middleware and socket task
pub struct AppState {
    /// Conversations and their participant snapshots
    pub chat: ChatRepository,

    /// Messages and seen receipts
    pub msg: MessageRepository,

    /// Farmer and consumer profile store
    pub profiles: ProfileRepository,

    /// Secret key for JWT tokens
    pub jwt_secret: String,

    /// Live connections and the rooms they joined
    pub rooms: RoomRegistry,

    /// A connection that sends nothing for this long is closed
    pub ws_idle_timeout: Duration,
}

impl AppState {
    /// Builds the state with every repository sharing the same pool.
    pub fn new(pool: SqlitePool, jwt_secret: String) -> Self {
        Self {
            chat: ChatRepository::new(pool.clone()),
            msg: MessageRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool),
            jwt_secret,
            rooms: RoomRegistry::new(),
            ws_idle_timeout: DEFAULT_WS_IDLE_TIMEOUT,
        }
    }

    pub fn with_ws_idle_timeout(mut self, timeout: Duration) -> Self {
        self.ws_idle_timeout = timeout;
        self
    }
}
