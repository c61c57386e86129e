//! A single room
//!
//! Owns the member map for one room id. All membership changes go through
//! the write lock; fanout and snapshots take the read lock. No `.await`
//! happens while either lock is held.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::admission::Identity;
use crate::connection::ClientSession;
use crate::error::RelayError;
use crate::protocol::{ClientId, Message, RoomId};

/// A freshly admitted session and the receiving end of its outbound queue
#[derive(Debug)]
pub struct Admission {
    pub session: Arc<ClientSession>,
    pub outbound: mpsc::Receiver<Message>,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Recipients whose queue accepted the message
    pub delivered: usize,
    /// Recipients whose queue was full; the message was dropped for them
    pub dropped: usize,
}

/// An isolated broadcast domain
pub struct Room {
    id: RoomId,
    members: RwLock<HashMap<ClientId, Arc<ClientSession>>>,
    outbound_capacity: usize,
    /// Parent of every member's cancellation token
    shutdown: CancellationToken,
    dropped_total: AtomicU64,
}

impl Room {
    pub fn new(id: RoomId, outbound_capacity: usize, shutdown: CancellationToken) -> Self {
        Self {
            id,
            members: RwLock::new(HashMap::new()),
            outbound_capacity: outbound_capacity.max(1),
            shutdown,
            dropped_total: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Register a new session under the lowest free client id
    pub fn admit(&self, identity: Identity) -> Admission {
        let (tx, rx) = mpsc::channel(self.outbound_capacity);

        let session = {
            let mut members = self.members.write();
            let id = lowest_free_id(&members);
            let session =
                ClientSession::new(id, self.id, identity, tx, self.shutdown.child_token());
            members.insert(id, session.clone());
            session
        };

        tracing::info!(
            room_id = self.id,
            client_id = session.id(),
            subject = %session.identity().subject,
            "Client joined room"
        );

        Admission {
            session,
            outbound: rx,
        }
    }

    /// Remove a member and mark its session `Closed`; removing an absent id
    /// is a no-op
    ///
    /// The session reaches `Closed` before the write lock is released, so its
    /// id is never handed to a new admission while it is still closing.
    /// Returns whether an entry was removed.
    pub fn remove(&self, client_id: ClientId) -> bool {
        self.remove_where(client_id, |_| true)
    }

    /// Remove `session` only if it still holds its id in this room
    pub(crate) fn release(&self, session: &Arc<ClientSession>) -> bool {
        self.remove_where(session.id(), |member| Arc::ptr_eq(member, session))
    }

    fn remove_where<F>(&self, client_id: ClientId, matches: F) -> bool
    where
        F: FnOnce(&Arc<ClientSession>) -> bool,
    {
        let removed = {
            let mut members = self.members.write();
            let session = if members.get(&client_id).is_some_and(matches) {
                members.remove(&client_id)
            } else {
                None
            };
            if let Some(session) = &session {
                session.mark_closed();
            }
            session.is_some()
        };

        if removed {
            tracing::info!(room_id = self.id, client_id, "Client left room");
        } else {
            tracing::trace!(room_id = self.id, client_id, "Client already removed");
        }

        removed
    }

    /// Fan a message out to every member except its sender
    ///
    /// Enqueueing never waits. A recipient with a full queue loses this one
    /// message and is counted as dropped; other recipients are unaffected.
    pub fn broadcast(&self, message: &Message) -> FanoutReport {
        let mut report = FanoutReport::default();

        {
            let members = self.members.read();
            for (id, session) in members.iter() {
                if *id == message.sender_id() {
                    continue;
                }

                match session.enqueue(message.clone()) {
                    Ok(()) => report.delivered += 1,
                    Err(e @ RelayError::CapacityExceeded { .. }) => {
                        tracing::warn!(error = %e, "Dropping message for slow recipient");
                        report.dropped += 1;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Skipping recipient");
                    }
                }
            }
        }

        if report.dropped > 0 {
            self.dropped_total
                .fetch_add(report.dropped as u64, Ordering::Relaxed);
        }

        tracing::trace!(
            room_id = self.id,
            sender_id = message.sender_id(),
            kind = ?message.kind(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Message fanned out"
        );

        report
    }

    /// Point-in-time copy of the current members
    pub fn members_snapshot(&self) -> Vec<Arc<ClientSession>> {
        self.members.read().values().cloned().collect()
    }

    /// Current member ids in ascending order
    pub fn member_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.members.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.members.read().contains_key(&client_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    /// Messages dropped for full queues since the room was created
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("members", &self.member_count())
            .field("outbound_capacity", &self.outbound_capacity)
            .finish()
    }
}

/// Smallest non-negative id not currently in use, scanning up from zero
fn lowest_free_id(members: &HashMap<ClientId, Arc<ClientSession>>) -> ClientId {
    let mut id = 0;
    while members.contains_key(&id) {
        id += 1;
    }
    id
}
