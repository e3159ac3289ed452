//! Room registry - Live connections and the broadcast scopes they joined
//!
//! Every connection owns an unbounded outbound queue drained by its writer
//! task. Rooms are sets of connection ids: one personal room per user and one
//! room per conversation joined with `join_chat`.

use crate::dtos::ServerEvent;
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Outbound half of a connection's queue
pub type EventSender = UnboundedSender<Arc<ServerEvent>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// Personal notification room of a user, shared by all their connections
    User(String),
    /// Members currently viewing a conversation
    Chat(String),
}

impl Room {
    pub fn user(user_id: &str) -> Self {
        Room::User(user_id.to_string())
    }

    pub fn chat(chat_id: &str) -> Self {
        Room::Chat(chat_id.to_string())
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user_{id}"),
            Room::Chat(id) => write!(f, "chat_{id}"),
        }
    }
}

pub struct RoomRegistry {
    connections: DashMap<ConnectionId, EventSender>,
    rooms: DashMap<Room, HashSet<ConnectionId>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        RoomRegistry {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    #[instrument(skip(self, tx))]
    pub fn register(&self, connection_id: ConnectionId, tx: EventSender) {
        self.connections.insert(connection_id, tx);
        info!("Total open connections: {}", self.connections.len());
    }

    /// Forgets the connection and removes it from every room.
    /// Dropping its sender lets the writer task finish.
    #[instrument(skip(self))]
    pub fn unregister(&self, connection_id: &ConnectionId) {
        self.connections.remove(connection_id);
        self.rooms.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
        info!("Connection removed, {} still open", self.connections.len());
    }

    #[instrument(skip(self))]
    pub fn join(&self, room: Room, connection_id: ConnectionId) {
        debug!("Joining room");
        self.rooms.entry(room).or_default().insert(connection_id);
    }

    /// Returns whether the connection was a member
    #[instrument(skip(self))]
    pub fn leave(&self, room: &Room, connection_id: &ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room) {
            Some(mut members) => members.remove(connection_id),
            None => false,
        };
        self.rooms.remove_if(room, |_, members| members.is_empty());
        removed
    }

    pub fn is_member(&self, room: &Room, connection_id: &ConnectionId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains(connection_id))
    }

    pub fn room_size(&self, room: &Room) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Queues an event for a single connection
    pub fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) -> bool {
        self.deliver(connection_id, Arc::new(event))
    }

    /// Queues an event for every member of `room`. Returns how many connections got it.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn emit(&self, room: &Room, event: ServerEvent) -> usize {
        self.fan_out(room, None, event)
    }

    /// Like [`emit`](Self::emit) but skips `except`, typically the connection that caused the event.
    #[instrument(skip(self, event), fields(event = event.name()))]
    pub fn emit_except(&self, room: &Room, except: &ConnectionId, event: ServerEvent) -> usize {
        self.fan_out(room, Some(except), event)
    }

    fn fan_out(&self, room: &Room, except: Option<&ConnectionId>, event: ServerEvent) -> usize {
        // copy the member list so no shard lock is held while delivering
        let members: Vec<ConnectionId> = match self.rooms.get(room) {
            Some(members) => members
                .iter()
                .filter(|id| Some(*id) != except)
                .copied()
                .collect(),
            None => return 0,
        };

        // one allocation shared by every recipient
        let event = Arc::new(event);
        let delivered = members
            .iter()
            .filter(|id| self.deliver(id, event.clone()))
            .count();
        debug!(delivered, "Event fanned out");
        delivered
    }

    fn deliver(&self, connection_id: &ConnectionId, event: Arc<ServerEvent>) -> bool {
        match self.connections.get(connection_id) {
            Some(tx) => match tx.send(event) {
                Ok(()) => true,
                Err(_) => {
                    warn!(%connection_id, "Connection queue closed, event dropped");
                    false
                }
            },
            None => false,
        }
    }
}
