//! Session reader/writer tasks
//!
//! Each admitted session runs exactly two tasks that share one cancellation
//! token. Whichever task ends first cancels the other, and teardown only
//! starts once both have been joined.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::ClientSession;
use crate::error::RelayError;
use crate::protocol::{Frame, Message, NORMAL_CLOSURE};
use crate::room::{Admission, Room};

/// Why a session ended
#[derive(Debug)]
pub enum DisconnectReason {
    /// The client sent a close frame
    ClientClosed(Option<u16>),
    /// The inbound stream ended without a close frame
    StreamEnded,
    /// Cancelled from outside (explicit disconnect or shutdown)
    Cancelled,
    /// Reading or writing the transport failed
    Failed(RelayError),
    /// A session task panicked
    Aborted(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientClosed(Some(code)) => write!(f, "client closed ({code})"),
            Self::ClientClosed(None) => f.write_str("client closed"),
            Self::StreamEnded => f.write_str("stream ended"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed(e) => write!(f, "{e}"),
            Self::Aborted(e) => write!(f, "task aborted: {e}"),
        }
    }
}

/// Run an admitted session until it closes
///
/// Returns once the reader and writer have both finished, the transport has
/// been released, and the session has left `room` as `Closed`.
pub async fn drive_session<St, RE, Si, WE>(
    room: Arc<Room>,
    admission: Admission,
    stream: St,
    sink: Si,
    write_timeout: Duration,
) -> DisconnectReason
where
    St: Stream<Item = Result<Frame, RE>> + Unpin + Send + 'static,
    RE: fmt::Display + Send + 'static,
    Si: Sink<Frame, Error = WE> + Unpin + Send + 'static,
    WE: fmt::Display + Send + 'static,
{
    let Admission { session, outbound } = admission;
    session.activate();

    let reader = tokio::spawn(read_loop(room.clone(), session.clone(), stream));
    let writer = tokio::spawn(write_loop(session.clone(), outbound, sink, write_timeout));
    let (read_result, write_result) = tokio::join!(reader, writer);

    let write_error = match write_result {
        Ok((mut sink, None)) => {
            close_transport(&mut sink, &session, write_timeout).await;
            None
        }
        Ok((_, Some(e))) => Some(e),
        Err(e) => Some(RelayError::TransportWrite(format!("writer task failed: {e}"))),
    };

    let reason = match read_result {
        Ok(reason) => reason,
        Err(e) => DisconnectReason::Aborted(e.to_string()),
    };
    let reason = match (reason, write_error) {
        (DisconnectReason::Cancelled, Some(e)) => DisconnectReason::Failed(e),
        (reason, _) => reason,
    };

    // Leaves the room and reaches `Closed` in one step. A session that was
    // already removed is closed here; its id may belong to someone else now.
    room.release(&session);
    session.mark_closed();

    tracing::info!(
        room_id = room.id(),
        client_id = session.id(),
        reason = %reason,
        remaining = room.member_count(),
        "Session closed"
    );

    reason
}

async fn read_loop<St, RE>(
    room: Arc<Room>,
    session: Arc<ClientSession>,
    mut stream: St,
) -> DisconnectReason
where
    St: Stream<Item = Result<Frame, RE>> + Unpin,
    RE: fmt::Display,
{
    let cancel = session.cancel_token().clone();
    let _guard = cancel.clone().drop_guard();

    let reason = loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break DisconnectReason::Cancelled,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Frame::Close(code))) => {
                tracing::debug!(client_id = session.id(), code = ?code, "Client sent close");
                break DisconnectReason::ClientClosed(code);
            }
            Some(Ok(Frame::Ping(_) | Frame::Pong(_))) => {
                tracing::trace!(client_id = session.id(), "Control frame received");
            }
            Some(Ok(frame)) => {
                if let Some(message) = Message::from_frame(frame, session.id()) {
                    room.broadcast(&message);
                }
            }
            Some(Err(e)) => {
                let error = RelayError::TransportRead(e.to_string());
                tracing::warn!(
                    room_id = room.id(),
                    client_id = session.id(),
                    error = %error,
                    "Read failed"
                );
                break DisconnectReason::Failed(error);
            }
            None => break DisconnectReason::StreamEnded,
        }
    };

    session.disconnect();
    reason
}

async fn write_loop<Si, WE>(
    session: Arc<ClientSession>,
    mut outbound: mpsc::Receiver<Message>,
    mut sink: Si,
    write_timeout: Duration,
) -> (Si, Option<RelayError>)
where
    Si: Sink<Frame, Error = WE> + Unpin,
    WE: fmt::Display,
{
    let cancel = session.cancel_token().clone();
    let _guard = cancel.clone().drop_guard();

    let error = loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break None,
            message = outbound.recv() => match message {
                Some(message) => message.into_frame(),
                None => break None,
            },
            () = session.liveness_requested() => Frame::Ping(Bytes::new()),
        };

        let written = tokio::select! {
            biased;
            () = cancel.cancelled() => break None,
            written = timeout(write_timeout, sink.send(frame)) => written,
        };

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => break Some(RelayError::TransportWrite(e.to_string())),
            Err(_) => {
                break Some(RelayError::TransportWrite(format!(
                    "write timed out after {}ms",
                    write_timeout.as_millis()
                )))
            }
        }
    };

    if let Some(e) = &error {
        tracing::warn!(
            room_id = session.room_id(),
            client_id = session.id(),
            error = %e,
            "Write failed"
        );
    }

    session.disconnect();
    (sink, error)
}

/// Best-effort normal closure; the peer may already be gone
async fn close_transport<Si, WE>(sink: &mut Si, session: &ClientSession, write_timeout: Duration)
where
    Si: Sink<Frame, Error = WE> + Unpin,
    WE: fmt::Display,
{
    let closed = timeout(write_timeout, async {
        sink.send(Frame::Close(Some(NORMAL_CLOSURE))).await?;
        sink.close().await
    })
    .await;

    match closed {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(client_id = session.id(), error = %e, "Close handshake not completed");
        }
        Err(_) => {
            tracing::debug!(client_id = session.id(), "Close handshake timed out");
        }
    }
}
