//! Transport frames
//!
//! Sessions read and write `Frame`s, so they run the same way over an axum
//! `WebSocket` and over in-memory channels.

use axum::extract::ws::{self, CloseFrame, WebSocket};
use bytes::Bytes;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};

/// Standard "normal closure" close code.
pub const NORMAL_CLOSURE: u16 = ws::close_code::NORMAL;

/// A single transport frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    Ping(Bytes),
    Pong(Bytes),
    /// Close with an optional standard close code
    Close(Option<u16>),
}

impl From<ws::Message> for Frame {
    fn from(message: ws::Message) -> Self {
        match message {
            ws::Message::Text(text) => Self::Text(text),
            ws::Message::Binary(data) => Self::Binary(Bytes::from(data)),
            ws::Message::Ping(data) => Self::Ping(Bytes::from(data)),
            ws::Message::Pong(data) => Self::Pong(Bytes::from(data)),
            ws::Message::Close(frame) => Self::Close(frame.map(|f| f.code)),
        }
    }
}

impl From<Frame> for ws::Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::Text(text),
            Frame::Binary(data) => Self::Binary(data.to_vec()),
            Frame::Ping(data) => Self::Ping(data.to_vec()),
            Frame::Pong(data) => Self::Pong(data.to_vec()),
            Frame::Close(code) => Self::Close(code.map(|code| CloseFrame {
                code,
                reason: "".into(),
            })),
        }
    }
}

/// Split an upgraded socket into a frame sink and a frame stream
pub fn split_socket(
    socket: WebSocket,
) -> (
    impl Sink<Frame, Error = axum::Error> + Unpin + Send + 'static,
    impl Stream<Item = Result<Frame, axum::Error>> + Unpin + Send + 'static,
) {
    let (sink, stream) = socket.split();
    let sink = sink.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(ws::Message::from(frame))));
    let stream = stream.map(|result| result.map(Frame::from));
    (sink, stream)
}
