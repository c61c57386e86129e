//! # relay-gateway
//!
//! WebSocket room relay: clients join a numbered room and every text or
//! binary frame they send is fanned out to the other members of that room.

pub mod admission;
pub mod connection;
pub mod error;
pub mod liveness;
pub mod protocol;
pub mod room;
pub mod server;

pub use admission::{AdmissionGate, AdmissionRejected, Identity, JwtAdmissionGate};
pub use connection::{drive_session, ClientSession, DisconnectReason, SessionState};
pub use error::{RelayError, RelayResult};
pub use liveness::{LivenessProbe, ProbeReport};
pub use protocol::{ClientId, Frame, Message, MessageKind, RoomId};
pub use room::{Admission, FanoutReport, Room, RoomRegistry};
pub use server::{create_app, create_gateway_state, run, serve, GatewayState};
