// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Client bridge: the persistent, authenticated, request/response-correlated
//! WebSocket channel to the game-client helper.
//!
//! One connection, many concurrent in-flight requests. A single reader task
//! parses response envelopes and fulfils per-request one-shot waiters; the
//! write side is serialized behind an async mutex. Reconnection is lazy with
//! exponential backoff, and every `Ready` transition re-runs the `hello`
//! handshake to refresh the cached capability map.

pub mod protocol;

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::{Duration, Instant};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use regex::Regex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, WorldEditMode};

use protocol::{Capabilities, HelloResult, RequestEnvelope, ResponseEnvelope};

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const BACKOFF_JITTER_FACTOR: f64 = 0.25;
const INBOX_LIMIT: usize = 100;

/// WorldEdit command roots. A command is "large-region" when it starts with
/// `//` or its first verb is in this set.
const WORLDEDIT_VERBS: [&str; 40] = [
    "pos1", "pos2", "hpos1", "hpos2", "sel", "wand", "expand", "contract", "size", "count",
    "distr", "set", "replace", "overlay", "center", "line", "curve", "move", "stack", "copy",
    "cut", "paste", "rotate", "flip", "undo", "redo", "clearhistory", "sphere", "hsphere", "cyl",
    "hcyl", "pyramid", "hpyramid", "walls", "faces", "hollow", "smooth", "deform", "generate",
    "schem",
];

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingSender = oneshot::Sender<Result<ResponseEnvelope, BridgeError>>;

/// Connection lifecycle state, visible through [`Bridge::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    Closing,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Ready => "ready",
            Self::Closing => "closing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The socket dropped, or could not be opened.
    ConnectionLost(String),
    /// A reconnect attempt is suppressed by the backoff window.
    Backoff { remaining: Duration, failures: u32 },
    /// The per-request deadline elapsed before a response arrived.
    Timeout { message_type: String },
    /// The caller abandoned the request.
    Cancelled,
    /// The peer rejected the shared token; terminal for the connection.
    AuthFailed,
    /// The peer answered `ok=false`; carries its error string verbatim.
    Peer(String),
    /// A frame violated the envelope contract.
    Protocol(String),
    /// The active WorldEdit mode forbids this command.
    WorldEditPolicy(String),
}

impl BridgeError {
    /// Stable category tag surfaced through the MCP error payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionLost(_) | Self::Backoff { .. } => "connection_lost",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::AuthFailed => "auth_failed",
            Self::Peer(_) => "peer_error",
            Self::Protocol(_) => "protocol_error",
            Self::WorldEditPolicy(_) => "worldedit_policy",
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(detail) => write!(f, "connection_lost: {detail}"),
            Self::Backoff { remaining, failures } => write!(
                f,
                "connection_lost: reconnect suppressed for {:.1}s after {failures} failures",
                remaining.as_secs_f64()
            ),
            Self::Timeout { message_type } => {
                write!(f, "timed out waiting for response to {message_type}")
            }
            Self::Cancelled => f.write_str("request cancelled"),
            Self::AuthFailed => f.write_str("Authentication failed"),
            Self::Peer(error) => f.write_str(error),
            Self::Protocol(detail) => write!(f, "protocol error: {detail}"),
            Self::WorldEditPolicy(detail) => f.write_str(detail),
        }
    }
}

impl std::error::Error for BridgeError {}

#[derive(Debug, Default)]
struct Backoff {
    consecutive_failures: u32,
    backoff_until: Option<Instant>,
}

impl Backoff {
    fn record_failure(&mut self) -> Duration {
        self.consecutive_failures += 1;
        let exponent = self.consecutive_failures.saturating_sub(1).min(16);
        let base = BACKOFF_BASE.as_secs_f64() * f64::from(2u32.saturating_pow(exponent));
        let capped = base.min(BACKOFF_CAP.as_secs_f64());
        let jitter = capped * BACKOFF_JITTER_FACTOR * rand::rng().random_range(-1.0..=1.0);
        let delay = Duration::from_secs_f64((capped + jitter).max(0.0));
        self.backoff_until = Some(Instant::now() + delay);
        delay
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.backoff_until = None;
    }

    fn remaining(&self) -> Option<Duration> {
        let until = self.backoff_until?;
        let now = Instant::now();
        if now < until {
            Some(until - now)
        } else {
            None
        }
    }
}

struct Connection {
    sink: Mutex<SplitSink<WsStream, Message>>,
    generation: u64,
    reader: tokio::task::JoinHandle<()>,
}

struct BridgeInner {
    endpoint: String,
    token: Option<String>,
    default_timeout: Duration,
    worldedit_mode: WorldEditMode,
    command_logging: bool,
    /// Guards connection setup and teardown; not taken by the reader task.
    connection: Mutex<Option<Arc<Connection>>>,
    state: StdMutex<(ConnectionState, u64)>,
    pending: StdMutex<HashMap<String, PendingSender>>,
    capabilities: StdMutex<Capabilities>,
    inbox: StdMutex<VecDeque<Value>>,
    backoff: StdMutex<Backoff>,
    auth_failed: StdMutex<bool>,
    generation: AtomicU64,
    /// Serializes `command.execute` calls. The helper attributes chat capture
    /// windows to the most recent command, so concurrent commands would mix
    /// their execution reports.
    command_gate: Mutex<()>,
}

/// Diagnostic snapshot for the `bridge.status` tool.
#[derive(Debug, Clone)]
pub struct BridgeStatus {
    pub endpoint: String,
    pub state: ConnectionState,
    pub consecutive_failures: u32,
    pub backoff_remaining: Option<Duration>,
    pub auth_failed: bool,
    pub capabilities: Capabilities,
}

/// Handle to the game-client helper. Cheap to clone; all clones share the
/// same connection, pending map, and capability cache.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl Bridge {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                endpoint: config.bridge_endpoint(),
                token: config.bridge_token.clone(),
                default_timeout: config.request_timeout,
                worldedit_mode: config.worldedit_mode,
                command_logging: config.command_logging,
                connection: Mutex::new(None),
                state: StdMutex::new((ConnectionState::Disconnected, 0)),
                pending: StdMutex::new(HashMap::new()),
                capabilities: StdMutex::new(Capabilities::default()),
                inbox: StdMutex::new(VecDeque::new()),
                backoff: StdMutex::new(Backoff::default()),
                auth_failed: StdMutex::new(false),
                generation: AtomicU64::new(0),
                command_gate: Mutex::new(()),
            }),
        }
    }

    /// Open the WebSocket, perform the `hello` handshake, cache capabilities.
    pub async fn start(&self) -> Result<(), BridgeError> {
        self.ensure_connection().await?;
        Ok(())
    }

    /// Cached capability map; empty until the handshake completes.
    pub fn capabilities(&self) -> Capabilities {
        lock_or_poisoned(&self.inner.capabilities).clone()
    }

    pub fn state(&self) -> ConnectionState {
        lock_or_poisoned(&self.inner.state).0
    }

    pub fn status(&self) -> BridgeStatus {
        let backoff = lock_or_poisoned(&self.inner.backoff);
        BridgeStatus {
            endpoint: self.inner.endpoint.clone(),
            state: self.state(),
            consecutive_failures: backoff.consecutive_failures,
            backoff_remaining: backoff.remaining(),
            auth_failed: *lock_or_poisoned(&self.inner.auth_failed),
            capabilities: self.capabilities(),
        }
    }

    /// Return and clear out-of-band messages (frames without a correlation id).
    pub fn drain_inbox(&self) -> Vec<Value> {
        lock_or_poisoned(&self.inner.inbox).drain(..).collect()
    }

    /// Send one request and wait for the correlated response.
    pub async fn request(
        &self,
        message_type: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, BridgeError> {
        let connection = self.ensure_connection().await?;
        let timeout = timeout.unwrap_or(self.inner.default_timeout);
        self.raw_request(&connection, message_type, payload, timeout).await
    }

    /// Drain and shut down. Pending requests fail with `connection_lost`.
    pub async fn close(&self) {
        let mut guard = self.inner.connection.lock().await;
        set_state(&self.inner, ConnectionState::Closing);
        if let Some(connection) = guard.take() {
            {
                let mut sink = connection.sink.lock().await;
                let _ = sink.close().await;
            }
            connection.reader.abort();
        }
        fail_pending(&self.inner, "bridge closed");
        lock_or_poisoned(&self.inner.capabilities).0.clear();
        set_state(&self.inner, ConnectionState::Disconnected);
    }

    // ---- connection lifecycle ------------------------------------------------

    async fn ensure_connection(&self) -> Result<Arc<Connection>, BridgeError> {
        let inner = &self.inner;
        let mut guard = inner.connection.lock().await;

        if let Some(connection) = guard.as_ref() {
            if connection.reader.is_finished() {
                *guard = None;
            } else {
                return Ok(connection.clone());
            }
        }

        if *lock_or_poisoned(&inner.auth_failed) {
            return Err(BridgeError::AuthFailed);
        }
        let suppressed = {
            let backoff = lock_or_poisoned(&inner.backoff);
            backoff.remaining().map(|remaining| (remaining, backoff.consecutive_failures))
        };
        if let Some((remaining, failures)) = suppressed {
            return Err(BridgeError::Backoff { remaining, failures });
        }

        set_state(inner, ConnectionState::Connecting);
        let stream = match connect_async(inner.endpoint.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(err) => {
                let delay = lock_or_poisoned(&inner.backoff).record_failure();
                set_state(inner, ConnectionState::Disconnected);
                debug!(
                    endpoint = %inner.endpoint,
                    backoff_secs = delay.as_secs_f64(),
                    "bridge connect failed: {err}"
                );
                return Err(BridgeError::ConnectionLost(format!(
                    "failed to connect to {}: {err}",
                    inner.endpoint
                )));
            }
        };

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (sink, reads) = stream.split();
        let reader = tokio::spawn(reader_loop(self.inner.clone(), reads, generation));
        let connection = Arc::new(Connection {
            sink: Mutex::new(sink),
            generation,
            reader,
        });
        *guard = Some(connection.clone());
        set_state_with_generation(inner, ConnectionState::Handshaking, generation);

        match self.handshake(&connection).await {
            Ok(hello) => {
                {
                    let mut capabilities = lock_or_poisoned(&inner.capabilities);
                    *capabilities = hello.capabilities;
                }
                lock_or_poisoned(&inner.backoff).reset();
                set_state_with_generation(inner, ConnectionState::Ready, generation);
                info!(
                    endpoint = %inner.endpoint,
                    client = %hello.client,
                    version = %hello.version,
                    "bridge connected"
                );
                Ok(connection)
            }
            Err(err) => {
                connection.reader.abort();
                *guard = None;
                if matches!(err, BridgeError::AuthFailed) {
                    *lock_or_poisoned(&inner.auth_failed) = true;
                    warn!(endpoint = %inner.endpoint, "bridge authentication failed (terminal)");
                } else {
                    lock_or_poisoned(&inner.backoff).record_failure();
                }
                set_state(inner, ConnectionState::Disconnected);
                Err(err)
            }
        }
    }

    async fn handshake(&self, connection: &Arc<Connection>) -> Result<HelloResult, BridgeError> {
        let result = self
            .raw_request(connection, "hello", json!({}), self.inner.default_timeout)
            .await?;
        let hello: HelloResult = serde_json::from_value(result)
            .map_err(|err| BridgeError::Protocol(format!("malformed hello result: {err}")))?;
        Ok(hello)
    }

    // ---- request plumbing ----------------------------------------------------

    async fn raw_request(
        &self,
        connection: &Arc<Connection>,
        message_type: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, BridgeError> {
        let inner = &self.inner;
        let request_id = Uuid::new_v4().simple().to_string();
        let (sender, receiver) = oneshot::channel();
        lock_or_poisoned(&inner.pending).insert(request_id.clone(), sender);
        let _guard = PendingGuard {
            inner: self.inner.clone(),
            request_id: request_id.clone(),
        };

        let envelope = RequestEnvelope {
            id: request_id.clone(),
            message_type: message_type.to_owned(),
            token: inner.token.clone(),
            payload,
        };
        let encoded = serde_json::to_string(&envelope)
            .map_err(|err| BridgeError::Protocol(format!("cannot encode request: {err}")))?;

        {
            let mut sink = connection.sink.lock().await;
            if let Err(err) = sink.send(Message::Text(encoded.into())).await {
                lock_or_poisoned(&inner.pending).remove(&request_id);
                return Err(BridgeError::ConnectionLost(format!("send failed: {err}")));
            }
        }

        let response = match tokio::time::timeout(timeout, receiver).await {
            Err(_elapsed) => {
                lock_or_poisoned(&inner.pending).remove(&request_id);
                return Err(BridgeError::Timeout {
                    message_type: message_type.to_owned(),
                });
            }
            Ok(Err(_closed)) => {
                return Err(BridgeError::ConnectionLost(
                    "connection dropped while waiting for response".to_owned(),
                ));
            }
            Ok(Ok(outcome)) => outcome?,
        };

        if response.ok {
            Ok(response.result.unwrap_or(Value::Null))
        } else {
            let error = response.error.unwrap_or_else(|| "request failed".to_owned());
            if error == "Authentication failed" {
                Err(BridgeError::AuthFailed)
            } else {
                Err(BridgeError::Peer(error))
            }
        }
    }

    // ---- domain operations ---------------------------------------------------

    /// Execute one game command. Applies normalization and the WorldEdit
    /// policy; the caller is responsible for having sanitized the command.
    pub async fn execute_command(&self, command: &str) -> Result<String, BridgeError> {
        let normalized = normalize_command(command);
        if normalized.is_empty() {
            return Err(BridgeError::Protocol("empty command".to_owned()));
        }
        self.enforce_worldedit_policy(&normalized)?;

        if self.inner.command_logging {
            info!(command = %normalized, "command.execute");
        }

        let _gate = self.inner.command_gate.lock().await;
        let result = self
            .request("command.execute", json!({ "command": normalized }), None)
            .await?;
        Ok(match result {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    fn enforce_worldedit_policy(&self, command: &str) -> Result<(), BridgeError> {
        if !is_worldedit_command(command) {
            return Ok(());
        }
        match self.inner.worldedit_mode {
            WorldEditMode::Off => Err(BridgeError::WorldEditPolicy(
                "WorldEdit is disabled by configuration".to_owned(),
            )),
            WorldEditMode::Force => Ok(()),
            WorldEditMode::Auto => {
                if self.capabilities().worldedit_available() == Some(true) {
                    Ok(())
                } else {
                    Err(BridgeError::WorldEditPolicy(
                        "WorldEdit is not available for this player".to_owned(),
                    ))
                }
            }
        }
    }

    pub async fn server_info(&self) -> Result<Value, BridgeError> {
        match self.request("server.info", json!({}), None).await {
            Ok(result) => Ok(result),
            Err(BridgeError::Peer(_)) => {
                // Older helpers lack server.info; assemble it from commands.
                let players = self.execute_command("list").await.unwrap_or_else(|_| {
                    "Unable to retrieve player list".to_owned()
                });
                let time = self
                    .execute_command("time query daytime")
                    .await
                    .unwrap_or_else(|_| "Unable to retrieve time".to_owned());
                let difficulty = self
                    .execute_command("difficulty")
                    .await
                    .unwrap_or_else(|_| "Unable to retrieve difficulty".to_owned());
                Ok(json!({ "players": players, "time": time, "difficulty": difficulty }))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn capture_screenshot(
        &self,
        max_width: u32,
        max_height: u32,
    ) -> Result<Value, BridgeError> {
        self.request(
            "screenshot.capture",
            json!({ "max_width": max_width, "max_height": max_height }),
            None,
        )
        .await
    }

    pub async fn scan_region(
        &self,
        bounds: (i64, i64, i64, i64, i64, i64),
        include_states: bool,
    ) -> Result<Value, BridgeError> {
        let (x1, y1, z1, x2, y2, z2) = bounds;
        self.request(
            "region.scan",
            json!({
                "x1": x1, "y1": y1, "z1": z1,
                "x2": x2, "y2": y2, "z2": z2,
                "include_states": include_states,
            }),
            Some(self.scan_timeout()),
        )
        .await
    }

    pub async fn heightmap(
        &self,
        x1: i64,
        z1: i64,
        x2: i64,
        z2: i64,
    ) -> Result<Value, BridgeError> {
        self.request(
            "region.heightmap",
            json!({ "x1": x1, "z1": z1, "x2": x2, "z2": z2 }),
            Some(self.scan_timeout()),
        )
        .await
    }

    pub async fn player_context(&self, reach: f64) -> Result<Value, BridgeError> {
        self.request("player.context", json!({ "reach": reach }), None).await
    }

    pub async fn nearby_entities(&self, radius: f64) -> Result<Value, BridgeError> {
        self.request("player.entities", json!({ "radius": radius }), None).await
    }

    pub async fn analyze_palette(
        &self,
        x: i64,
        y: i64,
        z: i64,
        radius: u32,
    ) -> Result<Value, BridgeError> {
        self.request(
            "palette.analyze",
            json!({ "x": x, "y": y, "z": z, "radius": radius }),
            None,
        )
        .await
    }

    pub async fn analyze_palette_region(
        &self,
        bounds: (i64, i64, i64, i64, i64, i64),
    ) -> Result<Value, BridgeError> {
        let (x1, y1, z1, x2, y2, z2) = bounds;
        self.request(
            "palette.region",
            json!({ "x1": x1, "y1": y1, "z1": z1, "x2": x2, "y2": y2, "z2": z2 }),
            Some(self.scan_timeout()),
        )
        .await
    }

    pub async fn analyze_light(
        &self,
        bounds: (i64, i64, i64, i64, i64, i64),
        resolution: u32,
    ) -> Result<Value, BridgeError> {
        let (x1, y1, z1, x2, y2, z2) = bounds;
        self.request(
            "light.analyze",
            json!({
                "x1": x1, "y1": y1, "z1": z1,
                "x2": x2, "y2": y2, "z2": z2,
                "resolution": resolution,
            }),
            Some(self.scan_timeout()),
        )
        .await
    }

    pub async fn check_symmetry(
        &self,
        bounds: (i64, i64, i64, i64, i64, i64),
        axis: &str,
        tolerance: f64,
        resolution: u32,
    ) -> Result<Value, BridgeError> {
        let (x1, y1, z1, x2, y2, z2) = bounds;
        self.request(
            "symmetry.check",
            json!({
                "x1": x1, "y1": y1, "z1": z1,
                "x2": x2, "y2": y2, "z2": z2,
                "axis": axis, "tolerance": tolerance, "resolution": resolution,
            }),
            Some(self.scan_timeout()),
        )
        .await
    }

    /// Detect the WorldEdit version through its own `//version` command.
    pub async fn detect_worldedit_version(&self) -> Option<String> {
        let response = match self.execute_command("//version").await {
            Ok(response) => response,
            Err(err) => {
                debug!("WorldEdit version detection failed: {err}");
                return None;
            }
        };
        if !response.contains("WorldEdit") {
            return None;
        }
        worldedit_version_pattern()
            .captures(&response)
            .map(|captures| captures[1].to_owned())
    }

    /// Large region scans need more headroom than point queries.
    fn scan_timeout(&self) -> Duration {
        self.inner.default_timeout.max(Duration::from_secs(60))
    }
}

/// Removes the pending entry when the request future is dropped before a
/// terminal path (caller cancellation).
struct PendingGuard {
    inner: Arc<BridgeInner>,
    request_id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock_or_poisoned(&self.inner.pending).remove(&self.request_id);
    }
}

async fn reader_loop(
    inner: Arc<BridgeInner>,
    mut reads: SplitStream<WsStream>,
    generation: u64,
) {
    while let Some(frame) = reads.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(&inner, text.as_str()),
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_frame(&inner, text),
                Err(_) => debug!("bridge dropped non-UTF-8 binary frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!("bridge read failed: {err}");
                break;
            }
        }
    }

    fail_pending(&inner, "client bridge connection closed");
    let mut state = lock_or_poisoned(&inner.state);
    if state.1 == generation {
        *state = (ConnectionState::Disconnected, generation);
        drop(state);
        lock_or_poisoned(&inner.capabilities).0.clear();
        debug!("bridge disconnected");
    }
}

fn handle_frame(inner: &BridgeInner, text: &str) {
    let envelope: ResponseEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!("bridge dropped malformed frame: {err}");
            return;
        }
    };

    match envelope.id.clone() {
        Some(id) if !id.is_empty() => {
            let sender = lock_or_poisoned(&inner.pending).remove(&id);
            match sender {
                Some(sender) => {
                    let _ = sender.send(Ok(envelope));
                }
                None => debug!(request_id = %id, "bridge dropped response for unknown id"),
            }
        }
        _ => {
            let mut inbox = lock_or_poisoned(&inner.inbox);
            inbox.push_back(serde_json::to_value(&envelope).unwrap_or(Value::Null));
            while inbox.len() > INBOX_LIMIT {
                inbox.pop_front();
            }
        }
    }
}

fn fail_pending(inner: &BridgeInner, reason: &str) {
    let drained: Vec<PendingSender> = {
        let mut pending = lock_or_poisoned(&inner.pending);
        pending.drain().map(|(_, sender)| sender).collect()
    };
    for sender in drained {
        let _ = sender.send(Err(BridgeError::ConnectionLost(reason.to_owned())));
    }
}

fn set_state(inner: &BridgeInner, state: ConnectionState) {
    let mut guard = lock_or_poisoned(&inner.state);
    guard.0 = state;
}

fn set_state_with_generation(inner: &BridgeInner, state: ConnectionState, generation: u64) {
    *lock_or_poisoned(&inner.state) = (state, generation);
}

fn lock_or_poisoned<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Trim and ensure a leading slash; commands arriving bare are chat-prefixed.
pub fn normalize_command(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

/// Whether a command is a large-region (WorldEdit) command.
pub fn is_worldedit_command(command: &str) -> bool {
    if command.starts_with("//") {
        return true;
    }
    if !command.starts_with('/') {
        return false;
    }
    let verb = command
        .trim_start_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    WORLDEDIT_VERBS.contains(&verb.as_str())
}

fn worldedit_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"WorldEdit.*?(\d+\.\d+\.\d+)").expect("static pattern compiles")
    })
}

#[cfg(test)]
pub(crate) mod testutil;

#[cfg(test)]
mod tests;
