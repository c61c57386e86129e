//! Room registry
//!
//! Maps room ids to rooms using `DashMap`. Rooms are created on first
//! reference and kept for the life of the process.

use std::sync::Arc;

use dashmap::DashMap;
use relay_common::RoomConfig;
use tokio_util::sync::CancellationToken;

use super::Room;
use crate::error::{RelayError, RelayResult};
use crate::protocol::RoomId;

/// All rooms known to this process
pub struct RoomRegistry {
    /// Rooms by id
    rooms: DashMap<RoomId, Arc<Room>>,

    /// Settings applied to every room and its sessions
    config: RoomConfig,

    /// Cancelling this ends every session in every room
    shutdown: CancellationToken,
}

impl RoomRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create an empty registry wrapped in Arc
    #[must_use]
    pub fn new_shared(config: RoomConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Get the room for `room_id`, creating it if this is the first reference
    ///
    /// The lookup and the insert happen under one shard lock via `entry`, so
    /// concurrent first references all observe the same room.
    pub fn resolve_or_create(&self, room_id: RoomId) -> Arc<Room> {
        self.rooms
            .entry(room_id)
            .or_insert_with(|| {
                tracing::debug!(room_id, "Room created");
                Arc::new(Room::new(
                    room_id,
                    self.config.outbound_capacity,
                    self.shutdown.child_token(),
                ))
            })
            .value()
            .clone()
    }

    /// Look up an existing room without creating it
    pub fn get(&self, room_id: RoomId) -> RelayResult<Arc<Room>> {
        self.rooms
            .get(&room_id)
            .map(|room| room.value().clone())
            .ok_or(RelayError::RoomNotFound(room_id))
    }

    /// Check if a room exists (diagnostics only)
    pub fn exists(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Snapshot of every room
    pub fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Get the number of rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Get the number of sessions across all rooms
    pub fn session_count(&self) -> usize {
        self.rooms.iter().map(|entry| entry.member_count()).sum()
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Token cancelled when the registry shuts down
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Cancel every session in every room
    pub fn shutdown(&self) {
        tracing::info!(
            rooms = self.room_count(),
            sessions = self.session_count(),
            "Shutting down room registry"
        );
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.rooms.len())
            .field("config", &self.config)
            .finish()
    }
}
