//! Wire-level types
//!
//! `Frame` is what travels over a transport; `Message` is what rooms fan out.

mod frame;
mod message;

pub use frame::{split_socket, Frame, NORMAL_CLOSURE};
pub use message::{ClientId, Message, MessageKind, RoomId};
