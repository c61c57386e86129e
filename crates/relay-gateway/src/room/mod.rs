//! Rooms and the room registry

mod registry;
mod room;

pub use registry::RoomRegistry;
pub use room::{Admission, FanoutReport, Room};
