//! Client session state
//!
//! Shared between the owning room, the reader and writer tasks, and the
//! liveness task.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch, Notify,
};
use tokio_util::sync::CancellationToken;

use crate::admission::Identity;
use crate::error::{RelayError, RelayResult};
use crate::protocol::{ClientId, Message, RoomId};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Registered in the room, tasks not started yet
    Admitted,
    /// Reader and writer both running
    Active,
    /// Cancellation observed, tasks unwinding
    Disconnecting,
    /// Both tasks finished and the session left its room
    Closed,
}

/// One admitted connection
pub struct ClientSession {
    /// Id within the room, unique among current members
    id: ClientId,

    /// Room this session was admitted to
    room_id: RoomId,

    /// Who the admission gate said this is
    identity: Identity,

    /// Bounded queue drained by the writer task
    outbound: mpsc::Sender<Message>,

    /// Single cancellation signal for both tasks
    cancel: CancellationToken,

    /// Pending liveness signal for the writer (coalesces)
    liveness: Notify,

    /// Lifecycle state; also serves as the completion signal
    state: watch::Sender<SessionState>,
}

impl ClientSession {
    pub(crate) fn new(
        id: ClientId,
        room_id: RoomId,
        identity: Identity,
        outbound: mpsc::Sender<Message>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Admitted);
        Arc::new(Self {
            id,
            room_id,
            identity,
            outbound,
            cancel,
            liveness: Notify::new(),
            state,
        })
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Queue a message for this session without waiting
    ///
    /// A full queue is reported as `CapacityExceeded`; the caller decides what
    /// a drop means. Never blocks, so it is safe under the room lock.
    pub fn enqueue(&self, message: Message) -> RelayResult<()> {
        match self.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(RelayError::CapacityExceeded {
                room_id: self.room_id,
                client_id: self.id,
            }),
            Err(TrySendError::Closed(_)) => Err(RelayError::SessionClosed(self.id)),
        }
    }

    /// Ask the writer to emit a ping frame
    ///
    /// Returns `false` if the session is already shutting down.
    pub fn ping(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.liveness.notify_one();
        true
    }

    /// Trigger cancellation of both tasks (idempotent)
    pub fn disconnect(&self) {
        self.cancel.cancel();
        self.state.send_if_modified(|state| match state {
            SessionState::Admitted | SessionState::Active => {
                *state = SessionState::Disconnecting;
                true
            }
            SessionState::Disconnecting | SessionState::Closed => false,
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the session reaches `Closed`
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == SessionState::Closed).await;
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) async fn liveness_requested(&self) {
        self.liveness.notified().await;
    }

    /// `Admitted -> Active`, unless cancellation already happened
    pub(crate) fn activate(&self) {
        // A session admitted after shutdown stays `Admitted` here and goes
        // straight to `Disconnecting`; it never reports `Active`.
        self.state.send_if_modified(|state| {
            if *state == SessionState::Admitted && !self.cancel.is_cancelled() {
                *state = SessionState::Active;
                true
            } else {
                false
            }
        });
    }

    /// Terminal transition; called by the room when it drops the member
    pub(crate) fn mark_closed(&self) {
        // Closed is only reachable through Disconnecting
        self.disconnect();
        self.state.send_replace(SessionState::Closed);
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .field("subject", &self.identity.subject)
            .field("state", &self.state())
            .finish()
    }
}
