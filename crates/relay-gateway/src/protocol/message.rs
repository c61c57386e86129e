//! Relay messages
//!
//! A `Message` is one payload received from a client, tagged with the id of
//! the sending session. It is immutable once built and cheap to clone, since
//! the payload is shared between every recipient queue.

use bytes::Bytes;
use serde::Serialize;

use super::Frame;

/// Identifier of a room
pub type RoomId = u64;

/// Identifier of a client within its room
pub type ClientId = u64;

/// Payload kind, mirrored from the transport frame it arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Binary,
}

/// A payload being fanned out to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: MessageKind,
    payload: Bytes,
    sender_id: ClientId,
}

impl Message {
    pub fn new(kind: MessageKind, payload: impl Into<Bytes>, sender_id: ClientId) -> Self {
        Self {
            kind,
            payload: payload.into(),
            sender_id,
        }
    }

    pub fn text(text: impl Into<String>, sender_id: ClientId) -> Self {
        Self::new(MessageKind::Text, Bytes::from(text.into()), sender_id)
    }

    pub fn binary(data: impl Into<Bytes>, sender_id: ClientId) -> Self {
        Self::new(MessageKind::Binary, data, sender_id)
    }

    /// Build a message from an inbound data frame
    ///
    /// Returns `None` for control frames and for empty payloads, neither of
    /// which is fanned out.
    pub fn from_frame(frame: Frame, sender_id: ClientId) -> Option<Self> {
        let message = match frame {
            Frame::Text(text) => Self::text(text, sender_id),
            Frame::Binary(data) => Self::binary(data, sender_id),
            Frame::Ping(_) | Frame::Pong(_) | Frame::Close(_) => return None,
        };
        (!message.is_empty()).then_some(message)
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn sender_id(&self) -> ClientId {
        self.sender_id
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Convert into the outbound frame written to a recipient
    pub fn into_frame(self) -> Frame {
        match self.kind {
            MessageKind::Text => Frame::Text(String::from_utf8_lossy(&self.payload).into_owned()),
            MessageKind::Binary => Frame::Binary(self.payload),
        }
    }
}
