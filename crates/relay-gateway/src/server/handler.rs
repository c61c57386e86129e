//! Request handlers
//!
//! Join requests are checked in a fixed order: credential, room id, upgrade.
//! Nothing touches a room until the upgrade has completed.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::admission::{extract_credential, Identity};
use crate::connection::drive_session;
use crate::error::{RelayError, RelayResult};
use crate::protocol::{split_socket, ClientId, RoomId};
use crate::room::Room;
use crate::server::GatewayState;

/// Diagnostics view of one room
#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub member_count: usize,
    pub member_ids: Vec<ClientId>,
    pub dropped_total: u64,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        let member_ids = room.member_ids();
        Self {
            room_id: room.id(),
            member_count: member_ids.len(),
            member_ids,
            dropped_total: room.dropped_total(),
        }
    }
}

/// `GET /ws/:room_id`
pub async fn join_room_handler(
    State(state): State<GatewayState>,
    Path(raw_room_id): Path<String>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> RelayResult<Response> {
    let credential = extract_credential(&headers, &state.config().jwt.cookie_name);
    let identity = state
        .admission()
        .validate(credential.as_deref())
        .map_err(|e| {
            tracing::info!(room = %raw_room_id, reason = %e, "Admission rejected");
            RelayError::from(e)
        })?;

    let room_id = parse_room_id(&raw_room_id)?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    tracing::debug!(room_id, subject = %identity.subject, "Admission accepted");

    Ok(ws
        .on_upgrade(move |socket| handle_socket(state, room_id, identity, socket))
        .into_response())
}

/// Run an upgraded connection to completion
async fn handle_socket(state: GatewayState, room_id: RoomId, identity: Identity, socket: WebSocket) {
    let room = state.registry().resolve_or_create(room_id);
    let admission = room.admit(identity);
    let (sink, stream) = split_socket(socket);

    drive_session(
        room,
        admission,
        stream,
        sink,
        state.config().rooms.write_timeout(),
    )
    .await;
}

/// `GET /rooms/:room_id`
pub async fn room_summary_handler(
    State(state): State<GatewayState>,
    Path(raw_room_id): Path<String>,
) -> RelayResult<Json<RoomSummary>> {
    let room_id = parse_room_id(&raw_room_id)?;
    let room = state.registry().get(room_id)?;
    Ok(Json(RoomSummary::from(room.as_ref())))
}

/// Room ids are non-negative decimal integers
pub fn parse_room_id(raw: &str) -> RelayResult<RoomId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RelayError::InvalidRoomId(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| RelayError::InvalidRoomId(raw.to_string()))
}
