//! Relay integration tests
//!
//! Each test boots its own server on a loopback port; no external services
//! are needed.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use integration_tests::{
    assert_json, assert_silent, assert_status, handshake_status, recv_data, unique_subject,
    ErrorEnvelope, TestServer,
};
use reqwest::StatusCode;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Admission Tests
// ============================================================================

#[tokio::test]
async fn test_join_without_credential_is_unauthorized() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/ws/7").await.unwrap();
    let body: ErrorEnvelope = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "MISSING_AUTH");

    let err = server.join_anonymous("7").await.unwrap_err();
    assert_eq!(handshake_status(&err), Some(401));

    // Rejected joins never create the room
    assert!(server.room(7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_join_with_invalid_token_is_unauthorized() {
    let server = TestServer::start().await.unwrap();

    let response = server.get_auth("/ws/7", "not.a.token").await.unwrap();
    let body: ErrorEnvelope = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "INVALID_TOKEN");

    let err = server.join("7", "not.a.token").await.unwrap_err();
    assert_eq!(handshake_status(&err), Some(401));

    let response = server.get("/rooms/7").await.unwrap();
    let body: ErrorEnvelope = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(body.error.code, "ROOM_NOT_FOUND");
}

#[tokio::test]
async fn test_join_with_expired_token_is_unauthorized() {
    let server = TestServer::start().await.unwrap();
    let token = server.expired_token(&unique_subject());

    let response = server.get_auth("/ws/7", &token).await.unwrap();
    let body: ErrorEnvelope = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_credential_is_checked_before_room_id() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/ws/not-a-room").await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_malformed_room_id_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(&unique_subject());

    for bad in ["abc", "-1", "7x", "1.5"] {
        let response = server.get_auth(&format!("/ws/{bad}"), &token).await.unwrap();
        let body: ErrorEnvelope = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
        assert_eq!(body.error.code, "INVALID_ROOM_ID");

        let err = server.join(bad, &token).await.unwrap_err();
        assert_eq!(handshake_status(&err), Some(400));
    }

    let response = server.get("/rooms/abc").await.unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_cookie_credential() {
    let server = TestServer::start().await.unwrap();
    let token = server.token(&unique_subject());

    let _ws = server.join_with_cookie("3", "token", &token).await.unwrap();
    server.wait_for_members(3, &[0]).await.unwrap();
}

#[tokio::test]
async fn test_custom_cookie_name() {
    let server = TestServer::start_with(&[("AUTH_COOKIE_NAME", "relay_auth")])
        .await
        .unwrap();
    let token = server.token(&unique_subject());

    let err = server.join_with_cookie("3", "token", &token).await.unwrap_err();
    assert_eq!(handshake_status(&err), Some(401));

    let _ws = server.join_with_cookie("3", "relay_auth", &token).await.unwrap();
    server.wait_for_members(3, &[0]).await.unwrap();
}

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_join_broadcast_leave() {
    let server = TestServer::start().await.unwrap();

    let mut a = server.join("7", &server.token("a")).await.unwrap();
    server.wait_for_members(7, &[0]).await.unwrap();
    let mut b = server.join("7", &server.token("b")).await.unwrap();
    server.wait_for_members(7, &[0, 1]).await.unwrap();

    a.send(Message::Text("hi".into())).await.unwrap();
    assert_eq!(recv_data(&mut b).await.unwrap(), Message::Text("hi".into()));
    assert_silent(&mut a, Duration::from_millis(200)).await.unwrap();

    a.close(None).await.unwrap();
    server.wait_for_members(7, &[1]).await.unwrap();

    // The freed id is reused
    let _c = server.join("7", &server.token("c")).await.unwrap();
    server.wait_for_members(7, &[0, 1]).await.unwrap();

    let summary = server.room(7).await.unwrap().unwrap();
    assert_eq!(summary.room_id, 7);
    assert_eq!(summary.member_count, 2);
    assert_eq!(summary.dropped_total, 0);
}

#[tokio::test]
async fn test_binary_fanout_and_per_sender_order() {
    let server = TestServer::start().await.unwrap();

    let mut a = server.join("1", &server.token("a")).await.unwrap();
    server.wait_for_members(1, &[0]).await.unwrap();
    let mut b = server.join("1", &server.token("b")).await.unwrap();
    let mut c = server.join("1", &server.token("c")).await.unwrap();
    server.wait_for_members(1, &[0, 1, 2]).await.unwrap();

    for i in 0u8..20 {
        a.send(Message::Binary(vec![i, 0xff])).await.unwrap();
    }

    for receiver in [&mut b, &mut c] {
        for i in 0u8..20 {
            assert_eq!(
                recv_data(receiver).await.unwrap(),
                Message::Binary(vec![i, 0xff])
            );
        }
    }
    assert_silent(&mut a, Duration::from_millis(100)).await.unwrap();
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let server = TestServer::start().await.unwrap();

    let mut one_a = server.join("1", &server.token("a")).await.unwrap();
    server.wait_for_members(1, &[0]).await.unwrap();
    let mut one_b = server.join("1", &server.token("b")).await.unwrap();
    let mut two = server.join("2", &server.token("c")).await.unwrap();
    server.wait_for_members(1, &[0, 1]).await.unwrap();
    server.wait_for_members(2, &[0]).await.unwrap();

    one_a.send(Message::Text("only room one".into())).await.unwrap();

    assert_eq!(
        recv_data(&mut one_b).await.unwrap(),
        Message::Text("only room one".into())
    );
    assert_silent(&mut two, Duration::from_millis(200)).await.unwrap();
}

#[tokio::test]
async fn test_empty_messages_are_not_relayed() {
    let server = TestServer::start().await.unwrap();

    let mut a = server.join("4", &server.token("a")).await.unwrap();
    server.wait_for_members(4, &[0]).await.unwrap();
    let mut b = server.join("4", &server.token("b")).await.unwrap();
    server.wait_for_members(4, &[0, 1]).await.unwrap();

    a.send(Message::Text(String::new())).await.unwrap();
    a.send(Message::Text("after".into())).await.unwrap();

    assert_eq!(recv_data(&mut b).await.unwrap(), Message::Text("after".into()));
}

#[tokio::test]
async fn test_abrupt_disconnect_frees_id() {
    let server = TestServer::start().await.unwrap();

    let a = server.join("9", &server.token("a")).await.unwrap();
    server.wait_for_members(9, &[0]).await.unwrap();
    let _b = server.join("9", &server.token("b")).await.unwrap();
    server.wait_for_members(9, &[0, 1]).await.unwrap();

    // Drop the socket without a close handshake
    drop(a);
    server.wait_for_members(9, &[1]).await.unwrap();
}

// ============================================================================
// Liveness and Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_liveness_ping_reaches_idle_client() {
    let server = TestServer::start_with(&[("LIVENESS_INTERVAL_SECS", "1")])
        .await
        .unwrap();

    let mut ws = server.join("5", &server.token("a")).await.unwrap();

    let ping = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(message) = ws.next().await {
            if let Ok(Message::Ping(_)) = message {
                return true;
            }
        }
        false
    })
    .await
    .expect("no ping within timeout");
    assert!(ping);

    // Still a member after answering pings
    server.wait_for_members(5, &[0]).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let server = TestServer::start().await.unwrap();

    let mut ws = server.join("6", &server.token("a")).await.unwrap();
    server.wait_for_members(6, &[0]).await.unwrap();

    server.shutdown().await;

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Close(frame)) => return frame.map(|f| u16::from(f.code)),
                Ok(_) => {}
                Err(_) => return None,
            }
        }
        None
    })
    .await
    .expect("session was not closed");
    assert_eq!(closed, Some(1000));
}
