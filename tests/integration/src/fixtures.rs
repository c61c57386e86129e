//! Response shapes and test data

use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique subject for a test caller
pub fn unique_subject() -> String {
    format!("user-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// `GET /rooms/:room_id` body
#[derive(Debug, Deserialize)]
pub struct RoomSummaryResponse {
    pub room_id: u64,
    pub member_count: usize,
    pub member_ids: Vec<u64>,
    pub dropped_total: u64,
}

/// Error envelope returned by every failing endpoint
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
