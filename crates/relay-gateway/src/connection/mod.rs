//! Client sessions
//!
//! A session is one admitted connection: its shared state lives in
//! [`ClientSession`], and [`drive_session`] runs its reader and writer tasks.

mod driver;
mod session;

pub use driver::{drive_session, DisconnectReason};
pub use session::{ClientSession, SessionState};
