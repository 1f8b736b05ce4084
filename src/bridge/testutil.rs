// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! In-process WebSocket peer used by bridge, build, and MCP tests.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::config::Config;

use super::protocol::RequestEnvelope;

pub type PeerStream = WebSocketStream<TcpStream>;

pub fn test_config(port: u16) -> Config {
    Config {
        bridge_port: port,
        request_timeout: Duration::from_secs(2),
        command_logging: false,
        ..Config::default()
    }
}

pub async fn bind_peer() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind peer listener");
    let port = listener.local_addr().expect("peer addr").port();
    (listener, port)
}

pub async fn accept_peer(listener: &TcpListener) -> PeerStream {
    let (stream, _addr) = listener.accept().await.expect("accept peer connection");
    accept_async(stream).await.expect("websocket handshake")
}

pub async fn read_request(peer: &mut PeerStream) -> RequestEnvelope {
    loop {
        let frame = peer.next().await.expect("peer frame").expect("peer read");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("request envelope");
        }
    }
}

pub async fn send_ok(peer: &mut PeerStream, id: &str, result: Value) {
    let frame = json!({ "id": id, "ok": true, "result": result }).to_string();
    peer.send(Message::Text(frame.into())).await.expect("peer send");
}

pub async fn send_err(peer: &mut PeerStream, id: &str, error: &str) {
    let frame = json!({ "id": id, "ok": false, "error": error }).to_string();
    peer.send(Message::Text(frame.into())).await.expect("peer send");
}

pub fn hello_result(worldedit_available: bool) -> Value {
    json!({
        "client": "fabric",
        "version": "0.4.1",
        "minecraft": "1.21.4",
        "capabilities": {
            "worldedit": { "available": worldedit_available, "reason": "test" },
            "vision": true,
        },
    })
}

pub async fn answer_hello(peer: &mut PeerStream, worldedit_available: bool) {
    let request = read_request(peer).await;
    assert_eq!(request.message_type, "hello");
    send_ok(peer, &request.id, hello_result(worldedit_available)).await;
}

/// Commands observed by a scripted helper peer, in arrival order.
pub type CommandLog = Arc<StdMutex<Vec<String>>>;

/// Spawn a helper that answers the handshake and then serves requests until
/// the socket closes: `command.execute` succeeds (commands containing
/// "fail_me" report an error string), `player.context` returns a fixed
/// position, everything else echoes an empty object.
pub async fn spawn_scripted_helper(
    worldedit_available: bool,
) -> (u16, CommandLog, tokio::task::JoinHandle<()>) {
    let (listener, port) = bind_peer().await;
    let log: CommandLog = Arc::new(StdMutex::new(Vec::new()));
    let task_log = log.clone();

    let handle = tokio::spawn(async move {
        let mut peer = accept_peer(&listener).await;
        answer_hello(&mut peer, worldedit_available).await;

        loop {
            let frame = match peer.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            };
            let Ok(request) = serde_json::from_str::<RequestEnvelope>(frame.as_str()) else {
                continue;
            };
            match request.message_type.as_str() {
                "command.execute" => {
                    let command = request.payload["command"].as_str().unwrap_or("").to_owned();
                    task_log
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push(command.clone());
                    if command.contains("fail_me") {
                        send_ok(&mut peer, &request.id, json!("Unknown command: fail_me")).await;
                    } else {
                        send_ok(&mut peer, &request.id, json!("Done")).await;
                    }
                }
                "player.context" => {
                    send_ok(
                        &mut peer,
                        &request.id,
                        json!({
                            "position": {
                                "x": 100.5, "y": 64.0, "z": 200.5,
                                "block_x": 100, "block_y": 64, "block_z": 200,
                            },
                            "rotation": { "yaw": 0.0, "pitch": 0.0, "facing": "north" },
                            "dimension": "minecraft:overworld",
                        }),
                    )
                    .await;
                }
                "region.scan" => {
                    send_ok(
                        &mut peer,
                        &request.id,
                        json!({
                            "origin": [0, 64, 0],
                            "dimensions": [2, 1, 2],
                            "palette": ["minecraft:air", "minecraft:stone"],
                            "blocks": [[0, 2], 1, 1],
                            "stats": { "total_blocks": 4, "unique_types": 2 },
                        }),
                    )
                    .await;
                }
                "region.heightmap" => {
                    send_ok(
                        &mut peer,
                        &request.id,
                        json!({
                            "heights": [[71]],
                            "surface_blocks": [["minecraft:grass_block"]],
                            "min_height": 71,
                            "max_height": 71,
                        }),
                    )
                    .await;
                }
                _ => send_ok(&mut peer, &request.id, json!({})).await,
            }
        }
    });

    (port, log, handle)
}

pub fn logged_commands(log: &CommandLog) -> Vec<String> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
}
