//! Subscription registry collaborator.
//!
//! Tracks the ephemeral realtime rooms clients subscribe to. The dispatch
//! core only needs the room listing (for collection resolution) and the
//! subscribe/unsubscribe entry points used by the subscribe controller;
//! filter matching against incoming events is the registry's own business
//! and out of scope here.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use thiserror::Error;

use crate::request::Request;

/// One active realtime room, owned by exactly one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeRoom {
    /// Room name; mirrors the collection the subscription targets
    pub name: String,
    /// Index owning the room
    pub index: String,
}

/// Errors reported by a subscription registry.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Subscribe/unsubscribe without an index and collection target
    #[error("missing subscription target")]
    MissingTarget,

    /// Unsubscribe from a room that does not exist
    #[error("unknown room: {0}")]
    UnknownRoom(String),
}

/// Realtime-state interface consumed by the dispatch core.
#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    /// Snapshot of all active rooms. Empty state yields an empty list,
    /// never an error.
    async fn realtime_rooms(&self) -> Vec<RealtimeRoom>;

    /// Register the request's connection in the room for its target
    /// index/collection, creating the room on first subscription.
    async fn subscribe(&self, request: &Request) -> Result<Value, SubscriptionError>;

    /// Remove the request's connection from the room, dropping the room
    /// once its last member leaves.
    async fn unsubscribe(&self, request: &Request) -> Result<Value, SubscriptionError>;
}

struct RoomEntry {
    room: RealtimeRoom,
    members: HashSet<String>,
}

/// Process-local subscription registry.
#[derive(Default)]
pub struct InMemorySubscriptions {
    rooms: DashMap<String, RoomEntry>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active room directly. Test and demo helper.
    pub fn seed_room(&self, name: &str, index: &str) {
        let id = room_id(index, name);
        self.rooms.insert(
            id,
            RoomEntry {
                room: RealtimeRoom {
                    name: name.to_string(),
                    index: index.to_string(),
                },
                members: HashSet::new(),
            },
        );
    }

    fn target(request: &Request) -> Result<(String, String), SubscriptionError> {
        match (request.index(), request.collection()) {
            (Some(index), Some(collection)) => Ok((index.to_string(), collection.to_string())),
            _ => Err(SubscriptionError::MissingTarget),
        }
    }
}

fn room_id(index: &str, collection: &str) -> String {
    format!("{index}/{collection}")
}

#[async_trait]
impl SubscriptionRegistry for InMemorySubscriptions {
    async fn realtime_rooms(&self) -> Vec<RealtimeRoom> {
        self.rooms.iter().map(|entry| entry.room.clone()).collect()
    }

    async fn subscribe(&self, request: &Request) -> Result<Value, SubscriptionError> {
        let (index, collection) = Self::target(request)?;
        let id = room_id(&index, &collection);
        let connection = request.context().connection_id.clone();

        let mut entry = self.rooms.entry(id.clone()).or_insert_with(|| RoomEntry {
            room: RealtimeRoom {
                name: collection.clone(),
                index: index.clone(),
            },
            members: HashSet::new(),
        });
        entry.members.insert(connection);
        let members = entry.members.len();
        drop(entry);

        Ok(json!({"roomId": id, "members": members}))
    }

    async fn unsubscribe(&self, request: &Request) -> Result<Value, SubscriptionError> {
        let (index, collection) = Self::target(request)?;
        let id = room_id(&index, &collection);
        let connection = &request.context().connection_id;

        let now_empty = {
            let Some(mut entry) = self.rooms.get_mut(&id) else {
                return Err(SubscriptionError::UnknownRoom(id));
            };
            entry.members.remove(connection);
            entry.members.is_empty()
        };
        if now_empty {
            self.rooms.remove(&id);
        }

        Ok(json!({"roomId": id}))
    }
}
