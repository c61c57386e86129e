//! Integration test utilities for the relay
//!
//! Boots the real router on a loopback port and drives it with HTTP and
//! WebSocket clients.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;
