//! Relay error types
//!
//! Transport and capacity errors stay local to one session; only admission
//! and lookup errors ever reach an HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_common::ErrorResponse;
use serde::Serialize;
use thiserror::Error;

use crate::admission::AdmissionRejected;
use crate::protocol::{ClientId, RoomId};

/// Relay error type
#[derive(Debug, Error)]
pub enum RelayError {
    /// Credential missing or invalid; the connection is never upgraded
    #[error("Admission rejected: {0}")]
    AdmissionRejected(#[from] AdmissionRejected),

    /// Room id in the request path is not a non-negative integer
    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    /// Reading from a client transport failed
    #[error("Transport read error: {0}")]
    TransportRead(String),

    /// Writing to a client transport failed or timed out
    #[error("Transport write error: {0}")]
    TransportWrite(String),

    /// Room lookup without creation found nothing
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// A recipient's outbound queue is full
    #[error("Outbound queue full for client {client_id} in room {room_id}")]
    CapacityExceeded { room_id: RoomId, client_id: ClientId },

    /// The recipient is already tearing down
    #[error("Session {0} is closed")]
    SessionClosed(ClientId),
}

impl RelayError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AdmissionRejected(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRoomId(_) => StatusCode::BAD_REQUEST,
            Self::RoomNotFound(_) => StatusCode::NOT_FOUND,
            Self::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::TransportRead(_) | Self::TransportWrite(_) | Self::SessionClosed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code for HTTP responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AdmissionRejected(AdmissionRejected::MissingCredential) => "MISSING_AUTH",
            Self::AdmissionRejected(AdmissionRejected::InvalidCredential) => "INVALID_TOKEN",
            Self::AdmissionRejected(AdmissionRejected::Expired) => "TOKEN_EXPIRED",
            Self::InvalidRoomId(_) => "INVALID_ROOM_ID",
            Self::TransportRead(_) => "TRANSPORT_READ_ERROR",
            Self::TransportWrite(_) => "TRANSPORT_WRITE_ERROR",
            Self::RoomNotFound(_) => "ROOM_NOT_FOUND",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::SessionClosed(_) => "SESSION_CLOSED",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorResponse,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            error: ErrorResponse::new(self.error_code(), self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

/// Relay result type
pub type RelayResult<T> = Result<T, RelayError>;
