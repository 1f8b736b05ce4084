// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! VibeCraft CLI entrypoint.
//!
//! By default this serves MCP over streamable HTTP at
//! `http://127.0.0.1:<port>/mcp`. Use `--mcp` to serve MCP over stdio instead
//! (intended for tool integrations). Configuration comes from `VIBECRAFT_*`
//! environment variables; see `config.rs` for the full surface.
//!
//! Exit codes: 0 normal shutdown, 1 fatal misconfiguration, 2 usage error or
//! bridge unreachable under `--require-bridge`.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vibecraft::bridge::BridgeError;
use vibecraft::config::Config;
use vibecraft::mcp::VibeCraftMcp;

const DEFAULT_MCP_HTTP_PORT: u16 = 8767;
const STARTUP_CONNECT_ATTEMPTS: u32 = 5;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--http-port <port>] [--require-bridge]\n  {program} --mcp [--require-bridge]\n\nDefault mode serves MCP over streamable HTTP at `http://127.0.0.1:<port>/mcp`\n(--http-port selects the port; default {DEFAULT_MCP_HTTP_PORT}).\n--mcp serves MCP over stdio instead.\n--require-bridge fails startup (exit 2) when the game client is unreachable.\n\nConfiguration is read from VIBECRAFT_* environment variables."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    mcp: bool,
    http_port: Option<u16>,
    require_bridge: bool,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mcp" => {
                if options.mcp {
                    return Err(());
                }
                options.mcp = true;
            }
            "--http-port" => {
                if options.http_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.http_port = Some(port);
            }
            "--require-bridge" => {
                if options.require_bridge {
                    return Err(());
                }
                options.require_bridge = true;
            }
            _ => return Err(()),
        }
    }

    if options.mcp && options.http_port.is_some() {
        return Err(());
    }

    Ok(options)
}

/// Try to reach the game client a few times before giving up. The bridge
/// applies its own backoff windows between attempts.
async fn connect_with_retry(server: &VibeCraftMcp) -> Result<(), BridgeError> {
    let mut last_error = BridgeError::ConnectionLost("no attempt made".to_owned());
    for attempt in 1..=STARTUP_CONNECT_ATTEMPTS {
        match server.bridge().start().await {
            Ok(()) => return Ok(()),
            Err(err @ BridgeError::AuthFailed) => return Err(err),
            Err(BridgeError::Backoff { remaining, .. }) => {
                tokio::time::sleep(remaining + Duration::from_millis(50)).await;
            }
            Err(err) => {
                warn!(attempt, "bridge connect failed: {err}");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

async fn startup(server: &VibeCraftMcp, require_bridge: bool) -> Result<(), i32> {
    match connect_with_retry(server).await {
        Ok(()) => {
            if server.config().version_detection {
                if let Some(version) = server.bridge().detect_worldedit_version().await {
                    info!(version = %version, "WorldEdit detected");
                }
            }
            Ok(())
        }
        Err(err) if require_bridge => {
            error!("bridge unreachable at startup: {err}");
            Err(2)
        }
        Err(err) => {
            warn!("bridge unreachable at startup, will reconnect lazily: {err}");
            Ok(())
        }
    }
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "vibecraft".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();

        let config = match Config::from_env() {
            Ok(config) => config,
            Err(err) => {
                error!("invalid configuration: {err}");
                std::process::exit(1);
            }
        };

        let server = VibeCraftMcp::new(config);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        if options.mcp {
            return runtime.block_on(async move {
                if let Err(code) = startup(&server, options.require_bridge).await {
                    std::process::exit(code);
                }
                let bridge = server.bridge().clone();
                let outcome = server.serve_stdio().await;
                bridge.close().await;
                outcome.map_err(Into::into)
            });
        }

        let http_port = options.http_port.unwrap_or(DEFAULT_MCP_HTTP_PORT);
        runtime.block_on(async move {
            if let Err(code) = startup(&server, options.require_bridge).await {
                std::process::exit(code);
            }

            let listener = tokio::net::TcpListener::bind(("127.0.0.1", http_port)).await?;
            info!(port = http_port, "serving MCP over streamable HTTP at /mcp");

            let config = StreamableHttpServerConfig {
                stateful_mode: true,
                ..StreamableHttpServerConfig::default()
            };
            let shutdown_token = CancellationToken::new();
            let server_shutdown = shutdown_token.clone();

            let session_manager = Arc::new(LocalSessionManager::default());
            let bridge = server.bridge().clone();
            let mcp_service = {
                let server = server.clone();
                StreamableHttpService::new(move || Ok(server.clone()), session_manager, config)
            };

            let router = Router::new().nest_service("/mcp", mcp_service);
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = server_shutdown.cancelled() => {}
                }
            });
            let outcome = serve.await;

            shutdown_token.cancel();
            bridge.close().await;
            outcome.map_err(Into::into)
        })
    })();

    if let Err(err) = result {
        eprintln!("vibecraft: {err}");
        std::process::exit(1);
    }
}
