// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::testutil::{
    accept_peer, answer_hello, bind_peer, hello_result, read_request, send_err, send_ok,
    test_config,
};
use super::*;

use serde_json::json;

#[tokio::test]
async fn handshake_caches_capabilities() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;
        peer
    });

    let bridge = Bridge::new(&test_config(port));
    assert!(bridge.capabilities().is_empty());
    assert_eq!(bridge.state(), ConnectionState::Disconnected);

    bridge.start().await.expect("start");
    assert_eq!(bridge.state(), ConnectionState::Ready);
    assert_eq!(bridge.capabilities().worldedit_available(), Some(true));
    assert!(bridge.capabilities().flag("vision"));

    bridge.close().await;
    assert_eq!(bridge.state(), ConnectionState::Disconnected);
    drop(peer_task);
}

#[tokio::test]
async fn correlates_out_of_order_responses() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;

        let first = read_request(&mut peer).await;
        let second = read_request(&mut peer).await;
        // Reply in reverse order; the pending map must route each response
        // back to its own waiter.
        send_ok(&mut peer, &second.id, json!({ "echo": second.payload["reach"] })).await;
        send_ok(&mut peer, &first.id, json!({ "echo": first.payload["reach"] })).await;
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");

    let (first, second) = tokio::join!(
        bridge.request("player.context", json!({ "reach": 1 }), None),
        bridge.request("player.context", json!({ "reach": 2 }), None),
    );
    assert_eq!(first.expect("first")["echo"], json!(1));
    assert_eq!(second.expect("second")["echo"], json!(2));

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn timeout_discards_late_response_and_clears_pending() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;

        let request = read_request(&mut peer).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        send_ok(&mut peer, &request.id, json!("late")).await;
        // Hold the socket open so the late response is observed.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");

    let err = bridge
        .request("player.context", json!({ "reach": 8 }), Some(Duration::from_millis(30)))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }), "got {err:?}");

    // The late response must be dropped, not delivered and not queued.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(lock_or_poisoned(&bridge.inner.pending).is_empty());
    assert!(bridge.drain_inbox().is_empty());

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn disconnect_fails_in_flight_requests_and_reconnect_refreshes_capabilities() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        // First connection: answer the handshake, swallow three requests,
        // then drop the socket without responding.
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;
        for _ in 0..3 {
            read_request(&mut peer).await;
        }
        drop(peer);

        // Second connection: report different capabilities.
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, false).await;
        peer
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");
    assert_eq!(bridge.capabilities().worldedit_available(), Some(true));

    let (first, second, third) = tokio::join!(
        bridge.request("player.context", json!({ "reach": 1 }), None),
        bridge.request("player.context", json!({ "reach": 2 }), None),
        bridge.request("player.context", json!({ "reach": 3 }), None),
    );
    for outcome in [first, second, third] {
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), "connection_lost", "got {err:?}");
    }
    assert!(lock_or_poisoned(&bridge.inner.pending).is_empty());

    // Wait for the reader to observe the drop and settle state.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bridge.state(), ConnectionState::Disconnected);
    assert!(bridge.capabilities().is_empty());

    // A clean peer drop is not a connect failure, so reconnect is immediate.
    bridge.start().await.expect("reconnect");
    assert_eq!(bridge.state(), ConnectionState::Ready);
    assert_eq!(bridge.capabilities().worldedit_available(), Some(false));

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn auth_failure_at_handshake_is_terminal() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        let request = read_request(&mut peer).await;
        send_err(&mut peer, &request.id, "Authentication failed").await;
    });

    let mut config = test_config(port);
    config.bridge_token = Some("wrong".to_owned());
    let bridge = Bridge::new(&config);

    let err = bridge.start().await.unwrap_err();
    assert_eq!(err, BridgeError::AuthFailed);

    // Terminal: no further connection attempt is made.
    let err = bridge.start().await.unwrap_err();
    assert_eq!(err, BridgeError::AuthFailed);
    assert!(bridge.status().auth_failed);

    peer_task.await.expect("peer task");
}

#[tokio::test]
async fn connect_failure_enters_backoff_window() {
    // Nothing listens on this port; grab one and release it.
    let (listener, port) = bind_peer().await;
    drop(listener);

    let bridge = Bridge::new(&test_config(port));
    let err = bridge.start().await.unwrap_err();
    assert_eq!(err.kind(), "connection_lost");

    let err = bridge.start().await.unwrap_err();
    assert!(matches!(err, BridgeError::Backoff { failures: 1, .. }), "got {err:?}");
}

#[tokio::test]
async fn request_token_rides_every_envelope() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        let hello = read_request(&mut peer).await;
        assert_eq!(hello.token.as_deref(), Some("shared-secret"));
        send_ok(&mut peer, &hello.id, hello_result(true)).await;

        let request = read_request(&mut peer).await;
        assert_eq!(request.token.as_deref(), Some("shared-secret"));
        send_ok(&mut peer, &request.id, json!({})).await;
    });

    let mut config = test_config(port);
    config.bridge_token = Some("shared-secret".to_owned());
    let bridge = Bridge::new(&config);
    bridge.start().await.expect("start");
    bridge.request("player.context", json!({ "reach": 8 }), None).await.expect("request");

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn execute_command_normalizes_and_reports_peer_result() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;

        let request = read_request(&mut peer).await;
        assert_eq!(request.message_type, "command.execute");
        assert_eq!(request.payload["command"], json!("/list"));
        send_ok(&mut peer, &request.id, json!("There are 1 of a max of 8 players online")).await;
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");
    let report = bridge.execute_command("list").await.expect("execute");
    assert!(report.contains("players online"));

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn worldedit_off_rejects_large_region_commands_without_dispatch() {
    let mut config = test_config(1);
    config.worldedit_mode = WorldEditMode::Off;
    let bridge = Bridge::new(&config);

    // Policy is enforced before any connection attempt.
    let err = bridge.execute_command("//set stone").await.unwrap_err();
    assert_eq!(err.kind(), "worldedit_policy");
}

#[tokio::test]
async fn worldedit_auto_requires_reported_capability() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, false).await;

        let request = read_request(&mut peer).await;
        assert_eq!(request.payload["command"], json!("/setblock 0 64 0 stone"));
        send_ok(&mut peer, &request.id, json!("Changed the block")).await;
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");

    let err = bridge.execute_command("//set stone").await.unwrap_err();
    assert_eq!(err.kind(), "worldedit_policy");

    // Vanilla commands are unaffected.
    bridge.execute_command("/setblock 0 64 0 stone").await.expect("vanilla");

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn peer_error_carries_message_verbatim() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;

        let request = read_request(&mut peer).await;
        send_err(&mut peer, &request.id, "Unknown command: bogus").await;
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");
    let err = bridge.execute_command("/bogus").await.unwrap_err();
    assert_eq!(err, BridgeError::Peer("Unknown command: bogus".to_owned()));

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[tokio::test]
async fn frames_without_id_land_in_the_inbox() {
    let (listener, port) = bind_peer().await;
    let peer_task = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, true).await;
        let frame = json!({ "ok": true, "result": { "event": "player_moved" } }).to_string();
        peer.send(Message::Text(frame.into())).await.expect("peer send");
        tokio::time::sleep(Duration::from_millis(100)).await;
    });

    let bridge = Bridge::new(&test_config(port));
    bridge.start().await.expect("start");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let inbox = bridge.drain_inbox();
    assert_eq!(inbox.len(), 1);
    assert!(bridge.drain_inbox().is_empty());

    peer_task.await.expect("peer task");
    bridge.close().await;
}

#[test]
fn normalize_command_prefixes_bare_commands() {
    assert_eq!(normalize_command("list"), "/list");
    assert_eq!(normalize_command("/list"), "/list");
    assert_eq!(normalize_command("//set stone"), "//set stone");
    assert_eq!(normalize_command("  time set day  "), "/time set day");
    assert_eq!(normalize_command("   "), "");
}

#[test]
fn worldedit_detection_covers_prefix_and_verbs() {
    assert!(is_worldedit_command("//set stone"));
    assert!(is_worldedit_command("/sphere stone 5"));
    assert!(is_worldedit_command("/undo"));
    assert!(!is_worldedit_command("/setblock 0 64 0 stone"));
    assert!(!is_worldedit_command("say hello"));
}

#[test]
fn backoff_grows_and_caps() {
    let mut backoff = Backoff::default();
    let first = backoff.record_failure();
    assert!(first <= Duration::from_secs_f64(1.25));

    for _ in 0..10 {
        backoff.record_failure();
    }
    let capped = backoff.record_failure();
    // Cap 30s plus at most 25% jitter.
    assert!(capped <= Duration::from_secs_f64(37.5));
    assert!(capped >= Duration::from_secs_f64(22.5));

    backoff.reset();
    assert_eq!(backoff.consecutive_failures, 0);
    assert!(backoff.remaining().is_none());
}
