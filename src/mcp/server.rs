// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use tracing::debug;

use crate::bridge::{Bridge, BridgeError};
use crate::build::{BuildEngine, BuildError, BuildRequest, BuildSource};
use crate::catalog::{Catalog, CatalogError, CatalogKind};
use crate::config::Config;
use crate::region::{
    area_columns, box_volume, RegionSnapshot, MAX_ANALYSIS_SAMPLES, MAX_HEIGHTMAP_COLUMNS,
    MAX_PALETTE_RADIUS, MAX_REGION_SCAN_BLOCKS, MAX_RESOLUTION, MIN_RESOLUTION,
};
use crate::sanitize::{sanitize_command, Policy};

use super::types::*;

const DEFAULT_REACH: f64 = 128.0;
const DEFAULT_ENTITY_RADIUS: f64 = 32.0;
const MAX_ENTITY_RADIUS: f64 = 128.0;
const DEFAULT_SCREENSHOT_WIDTH: u32 = 1920;
const DEFAULT_SCREENSHOT_HEIGHT: u32 = 1080;

#[derive(Clone)]
pub struct VibeCraftMcp {
    config: Arc<Config>,
    bridge: Bridge,
    engine: Arc<BuildEngine>,
    catalog: Arc<Catalog>,
    policy: Policy,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl VibeCraftMcp {
    pub fn new(config: Config) -> Self {
        let bridge = Bridge::new(&config);
        Self::with_bridge(config, bridge)
    }

    pub fn with_bridge(config: Config, bridge: Bridge) -> Self {
        let engine = Arc::new(BuildEngine::new(bridge.clone(), &config));
        let policy = Policy::from_config(&config);
        Self {
            config: Arc::new(config),
            bridge,
            engine,
            catalog: Arc::new(Catalog::builtin()),
            policy,
            tool_router: Self::tool_router(),
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    /// Execute one game command; sanitized against the active safety policy
    /// before dispatch. Prefer `build.run` for multi-command work.
    #[tool(name = "command.execute")]
    async fn command_execute(
        &self,
        params: Parameters<CommandExecuteParams>,
    ) -> Result<Json<CommandExecuteResponse>, ErrorData> {
        let command = params.0.command;
        sanitize_command(&command, &self.policy).map_err(|rejection| {
            ErrorData::invalid_params(
                format!("command rejected: {rejection}"),
                Some(json!({ "kind": "sanitization_rejected", "rule": rejection.rule() })),
            )
        })?;

        let report = self.bridge.execute_command(&command).await.map_err(bridge_error_data)?;
        Ok(Json(CommandExecuteResponse { command, report }))
    }

    /// Game-server overview (players, time, difficulty); cheap first call to
    /// confirm the bridge is alive.
    #[tool(name = "server.info")]
    async fn server_info(&self) -> Result<Json<ServerInfoResponse>, ErrorData> {
        let info = self.bridge.server_info().await.map_err(bridge_error_data)?;
        Ok(Json(ServerInfoResponse { info }))
    }

    /// Player position as float and block coordinates; use `player.context`
    /// when you also need rotation and the ray-cast target.
    #[tool(name = "player.position")]
    async fn player_position(&self) -> Result<Json<PlayerPositionResponse>, ErrorData> {
        let context = self.bridge.player_context(8.0).await.map_err(bridge_error_data)?;
        let position = context.get("position").ok_or_else(|| {
            ErrorData::internal_error(
                "player context has no position",
                Some(json!({ "kind": "protocol_error" })),
            )
        })?;

        let number = |key: &str| -> Result<f64, ErrorData> {
            position.get(key).and_then(Value::as_f64).ok_or_else(|| {
                ErrorData::internal_error(
                    format!("player position is missing {key:?}"),
                    Some(json!({ "kind": "protocol_error" })),
                )
            })
        };
        let (x, y, z) = (number("x")?, number("y")?, number("z")?);
        let block = |key: &str, fallback: f64| {
            position.get(key).and_then(Value::as_i64).unwrap_or(fallback.floor() as i64)
        };

        Ok(Json(PlayerPositionResponse {
            x,
            y,
            z,
            block_x: block("block_x", x),
            block_y: block("block_y", y),
            block_z: block("block_z", z),
            dimension: context
                .get("dimension")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        }))
    }

    /// Full player context: position, rotation, eye/look vectors, ray-cast
    /// target with adjacent placement position, held item, game mode.
    #[tool(name = "player.context")]
    async fn player_context(
        &self,
        params: Parameters<PlayerContextParams>,
    ) -> Result<Json<PlayerContextResponse>, ErrorData> {
        let reach = params.0.reach.unwrap_or(DEFAULT_REACH).clamp(1.0, 256.0);
        let context = self.bridge.player_context(reach).await.map_err(bridge_error_data)?;
        Ok(Json(PlayerContextResponse { context }))
    }

    /// Entities near the player with position, type, and name.
    #[tool(name = "player.entities")]
    async fn player_entities(
        &self,
        params: Parameters<NearbyEntitiesParams>,
    ) -> Result<Json<NearbyEntitiesResponse>, ErrorData> {
        let radius = params.0.radius.unwrap_or(DEFAULT_ENTITY_RADIUS).clamp(1.0, MAX_ENTITY_RADIUS);
        let entities = self.bridge.nearby_entities(radius).await.map_err(bridge_error_data)?;
        Ok(Json(NearbyEntitiesResponse { entities }))
    }

    /// Y of the highest non-air block at one column; convenience wrapper over
    /// `region.heightmap`.
    #[tool(name = "surface.level")]
    async fn surface_level(
        &self,
        params: Parameters<SurfaceLevelParams>,
    ) -> Result<Json<SurfaceLevelResponse>, ErrorData> {
        let SurfaceLevelParams { x, z } = params.0;
        let result = self.bridge.heightmap(x, z, x, z).await.map_err(bridge_error_data)?;

        let surface_y = result
            .get("heights")
            .and_then(|rows| rows.get(0))
            .and_then(|row| row.get(0))
            .and_then(Value::as_i64);
        let surface_block = result
            .get("surface_blocks")
            .and_then(|rows| rows.get(0))
            .and_then(|row| row.get(0))
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);

        Ok(Json(SurfaceLevelResponse {
            x,
            z,
            surface_y,
            surface_block,
        }))
    }

    /// First-person screenshot as a base64 PNG data URL, with the player
    /// position and rotation at capture time.
    #[tool(name = "screenshot.capture")]
    async fn screenshot_capture(
        &self,
        params: Parameters<ScreenshotParams>,
    ) -> Result<Json<ScreenshotResponse>, ErrorData> {
        let max_width = params.0.max_width.unwrap_or(DEFAULT_SCREENSHOT_WIDTH).clamp(64, 3840);
        let max_height = params.0.max_height.unwrap_or(DEFAULT_SCREENSHOT_HEIGHT).clamp(64, 2160);
        let screenshot = self
            .bridge
            .capture_screenshot(max_width, max_height)
            .await
            .map_err(bridge_error_data)?;
        Ok(Json(ScreenshotResponse { screenshot }))
    }

    /// Palette-compressed scan of a rectangular region (max 64^3 blocks);
    /// decode `blocks` with `palette`, iterating y outermost, then z, then x.
    #[tool(name = "region.scan")]
    async fn region_scan(
        &self,
        params: Parameters<RegionScanParams>,
    ) -> Result<Json<RegionScanResponse>, ErrorData> {
        let RegionScanParams {
            x1,
            y1,
            z1,
            x2,
            y2,
            z2,
            include_states,
        } = params.0;
        let bounds = (x1, y1, z1, x2, y2, z2);
        let volume = box_volume(bounds);
        if volume > MAX_REGION_SCAN_BLOCKS {
            return Err(ErrorData::invalid_params(
                format!("region spans {volume} blocks, maximum is {MAX_REGION_SCAN_BLOCKS}"),
                Some(json!({ "volume": volume, "max": MAX_REGION_SCAN_BLOCKS })),
            ));
        }

        let result = self
            .bridge
            .scan_region(bounds, include_states.unwrap_or(false))
            .await
            .map_err(bridge_error_data)?;
        let snapshot = RegionSnapshot::from_result(&result).map_err(|err| {
            ErrorData::internal_error(
                format!("malformed region snapshot from helper: {err}"),
                Some(json!({ "kind": "protocol_error" })),
            )
        })?;
        // Round-trip the RLE stream so a corrupt payload fails loudly here
        // instead of in the agent's hands.
        snapshot.expand_blocks().map_err(|err| {
            ErrorData::internal_error(
                format!("region snapshot failed validation: {err}"),
                Some(json!({ "kind": "protocol_error" })),
            )
        })?;

        Ok(Json(RegionScanResponse {
            origin: [snapshot.origin.0, snapshot.origin.1, snapshot.origin.2],
            dimensions: [
                snapshot.dimensions.0,
                snapshot.dimensions.1,
                snapshot.dimensions.2,
            ],
            unique_blocks: snapshot.palette.len() as u64,
            total_blocks: snapshot.block_count() as u64,
            palette: snapshot.palette,
            blocks: result.get("blocks").cloned().unwrap_or(Value::Null),
            stats: snapshot.stats,
        }))
    }

    /// Surface heights and surface block ids over a rectangular area
    /// (max 256^2 columns).
    #[tool(name = "region.heightmap")]
    async fn region_heightmap(
        &self,
        params: Parameters<HeightmapParams>,
    ) -> Result<Json<HeightmapResponse>, ErrorData> {
        let HeightmapParams { x1, z1, x2, z2 } = params.0;
        let columns = area_columns(x1, z1, x2, z2);
        if columns > MAX_HEIGHTMAP_COLUMNS {
            return Err(ErrorData::invalid_params(
                format!("area spans {columns} columns, maximum is {MAX_HEIGHTMAP_COLUMNS}"),
                Some(json!({ "columns": columns, "max": MAX_HEIGHTMAP_COLUMNS })),
            ));
        }
        let heightmap = self.bridge.heightmap(x1, z1, x2, z2).await.map_err(bridge_error_data)?;
        Ok(Json(HeightmapResponse { heightmap }))
    }

    /// Block histogram in a sphere around a point, with category breakdown
    /// and inferred style tag (radius capped at 64).
    #[tool(name = "palette.analyze")]
    async fn palette_analyze(
        &self,
        params: Parameters<PaletteAnalyzeParams>,
    ) -> Result<Json<PaletteAnalyzeResponse>, ErrorData> {
        let PaletteAnalyzeParams { x, y, z, radius } = params.0;
        let radius = radius.unwrap_or(16);
        if radius == 0 || radius > MAX_PALETTE_RADIUS {
            return Err(ErrorData::invalid_params(
                format!("radius must be 1..={MAX_PALETTE_RADIUS}"),
                Some(json!({ "radius": radius })),
            ));
        }
        let palette =
            self.bridge.analyze_palette(x, y, z, radius).await.map_err(bridge_error_data)?;
        Ok(Json(PaletteAnalyzeResponse { palette }))
    }

    /// Block histogram over a rectangular region; box-shaped companion to
    /// `palette.analyze`.
    #[tool(name = "palette.region")]
    async fn palette_region(
        &self,
        params: Parameters<PaletteRegionParams>,
    ) -> Result<Json<PaletteAnalyzeResponse>, ErrorData> {
        let PaletteRegionParams {
            x1,
            y1,
            z1,
            x2,
            y2,
            z2,
        } = params.0;
        let bounds = (x1, y1, z1, x2, y2, z2);
        let volume = box_volume(bounds);
        if volume > MAX_ANALYSIS_SAMPLES {
            return Err(ErrorData::invalid_params(
                format!("region spans {volume} blocks, maximum is {MAX_ANALYSIS_SAMPLES}"),
                Some(json!({ "volume": volume, "max": MAX_ANALYSIS_SAMPLES })),
            ));
        }
        let palette =
            self.bridge.analyze_palette_region(bounds).await.map_err(bridge_error_data)?;
        Ok(Json(PaletteAnalyzeResponse { palette }))
    }

    /// Light distribution, dark spots, and light-placement suggestions over a
    /// region; resolution strides the sampling grid.
    #[tool(name = "light.analyze")]
    async fn light_analyze(
        &self,
        params: Parameters<LightAnalyzeParams>,
    ) -> Result<Json<LightAnalyzeResponse>, ErrorData> {
        let LightAnalyzeParams {
            x1,
            y1,
            z1,
            x2,
            y2,
            z2,
            resolution,
        } = params.0;
        let bounds = (x1, y1, z1, x2, y2, z2);
        let resolution = resolution.unwrap_or(1).clamp(MIN_RESOLUTION, MAX_RESOLUTION);
        check_sample_budget(bounds, resolution)?;

        let analysis =
            self.bridge.analyze_light(bounds, resolution).await.map_err(bridge_error_data)?;
        Ok(Json(LightAnalyzeResponse {
            analysis,
            resolution,
        }))
    }

    /// Mirror-symmetry check across an axis plane: per-cell mismatches, a
    /// score, and a verdict under the given tolerance.
    #[tool(name = "symmetry.check")]
    async fn symmetry_check(
        &self,
        params: Parameters<SymmetryCheckParams>,
    ) -> Result<Json<SymmetryCheckResponse>, ErrorData> {
        let SymmetryCheckParams {
            x1,
            y1,
            z1,
            x2,
            y2,
            z2,
            axis,
            tolerance,
            resolution,
        } = params.0;
        let axis = axis.to_ascii_lowercase();
        if !matches!(axis.as_str(), "x" | "y" | "z") {
            return Err(ErrorData::invalid_params(
                "invalid axis (expected x|y|z)",
                Some(json!({ "axis": axis })),
            ));
        }
        let bounds = (x1, y1, z1, x2, y2, z2);
        let resolution = resolution.unwrap_or(1).clamp(MIN_RESOLUTION, MAX_RESOLUTION);
        check_sample_budget(bounds, resolution)?;
        let tolerance = tolerance.unwrap_or(0.05).clamp(0.0, 1.0);

        let analysis = self
            .bridge
            .check_symmetry(bounds, &axis, tolerance, resolution)
            .await
            .map_err(bridge_error_data)?;
        Ok(Json(SymmetryCheckResponse { analysis }))
    }

    /// Run a build from a command list, a sandboxed build script, or a
    /// schematic. Set `preview_only` to validate and inspect without placing
    /// a single block.
    #[tool(name = "build.run")]
    async fn build_run(
        &self,
        params: Parameters<BuildParams>,
    ) -> Result<Json<BuildResponse>, ErrorData> {
        let BuildParams {
            commands,
            code,
            schematic,
            preview_only,
            description,
            fail_fast,
            optimize,
        } = params.0;

        let provided =
            usize::from(commands.is_some()) + usize::from(code.is_some()) + usize::from(schematic.is_some());
        if provided != 1 {
            return Err(ErrorData::invalid_params(
                "provide exactly one of 'commands', 'code', or 'schematic'",
                Some(json!({ "provided": provided })),
            ));
        }

        let source = if let Some(commands) = commands {
            BuildSource::Commands(commands)
        } else if let Some(code) = code {
            BuildSource::Script(code)
        } else if let Some(schematic) = schematic {
            BuildSource::Schematic(schematic)
        } else {
            return Err(ErrorData::invalid_params("no build source provided", None));
        };

        let mut request =
            BuildRequest::new(source, description.unwrap_or_else(|| "building".to_owned()));
        request.preview_only = preview_only.unwrap_or(false);
        request.fail_fast = fail_fast.unwrap_or(false);
        request.optimize = optimize.unwrap_or(true);

        let report = self
            .engine
            .build(request, |progress| {
                debug!(
                    attempted = progress.attempted,
                    succeeded = progress.succeeded,
                    failed = progress.failed,
                    total = progress.total,
                    "build progress"
                );
            })
            .await
            .map_err(build_error_data)?;

        Ok(Json(BuildResponse {
            summary: report.summary(),
            description: report.description,
            preview: report.preview,
            attempted: report.attempted as u64,
            succeeded: report.succeeded as u64,
            failed: report.failed as u64,
            warnings: report.warnings,
            outcomes: report
                .commands
                .into_iter()
                .map(|(command, outcome)| CommandReport {
                    command,
                    outcome: outcome.label(),
                })
                .collect(),
        }))
    }

    /// Building-pattern catalog: look up one pattern by name, or list
    /// (optionally by category). Pure lookup, no bridge contact.
    #[tool(name = "catalog.pattern")]
    async fn catalog_pattern(
        &self,
        params: Parameters<CatalogLookupParams>,
    ) -> Result<Json<CatalogResponse>, ErrorData> {
        self.catalog_lookup(CatalogKind::Pattern, params.0)
    }

    /// Furniture catalog: look up one design by name, or list (optionally by
    /// category). Pure lookup, no bridge contact.
    #[tool(name = "catalog.furniture")]
    async fn catalog_furniture(
        &self,
        params: Parameters<CatalogLookupParams>,
    ) -> Result<Json<CatalogResponse>, ErrorData> {
        self.catalog_lookup(CatalogKind::Furniture, params.0)
    }

    /// Structure-template catalog: look up one template by name, or list
    /// (optionally by category). Pure lookup, no bridge contact.
    #[tool(name = "catalog.template")]
    async fn catalog_template(
        &self,
        params: Parameters<CatalogLookupParams>,
    ) -> Result<Json<CatalogResponse>, ErrorData> {
        self.catalog_lookup(CatalogKind::Template, params.0)
    }

    /// Bridge connection diagnostics: state, backoff, cached capabilities.
    #[tool(name = "bridge.status")]
    async fn bridge_status(&self) -> Result<Json<BridgeStatusResponse>, ErrorData> {
        let status = self.bridge.status();
        Ok(Json(BridgeStatusResponse {
            endpoint: status.endpoint,
            state: status.state.as_str().to_owned(),
            consecutive_failures: status.consecutive_failures,
            backoff_remaining_secs: status.backoff_remaining.map(|d| d.as_secs_f64()),
            auth_failed: status.auth_failed,
            capabilities: serde_json::to_value(&status.capabilities).unwrap_or(Value::Null),
        }))
    }

    fn catalog_lookup(
        &self,
        kind: CatalogKind,
        params: CatalogLookupParams,
    ) -> Result<Json<CatalogResponse>, ErrorData> {
        let categories = self
            .catalog
            .categories(kind)
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();

        let entries = match &params.name {
            Some(name) => {
                let entry = self.catalog.lookup(kind, name).map_err(catalog_error_data)?;
                vec![entry.clone()]
            }
            None => self
                .catalog
                .list(kind, params.category.as_deref())
                .into_iter()
                .cloned()
                .collect(),
        };

        Ok(Json(CatalogResponse {
            entries: entries
                .into_iter()
                .map(|entry| CatalogEntryView {
                    name: entry.name.to_owned(),
                    category: entry.category.to_owned(),
                    description: entry.description.to_owned(),
                    schematic: entry.schematic,
                })
                .collect(),
            categories,
        }))
    }
}

fn check_sample_budget(
    bounds: (i64, i64, i64, i64, i64, i64),
    resolution: u32,
) -> Result<(), ErrorData> {
    let stride = i64::from(resolution);
    let (x1, y1, z1, x2, y2, z2) = bounds;
    let samples_along = |a: i64, b: i64| ((b - a).abs() + stride) / stride;
    let samples = samples_along(x1, x2) * samples_along(y1, y2) * samples_along(z1, z2);
    if samples > MAX_ANALYSIS_SAMPLES {
        return Err(ErrorData::invalid_params(
            format!(
                "region requires {samples} samples at resolution {resolution}, maximum is {MAX_ANALYSIS_SAMPLES}"
            ),
            Some(json!({ "samples": samples, "max": MAX_ANALYSIS_SAMPLES })),
        ));
    }
    Ok(())
}

fn bridge_error_data(err: BridgeError) -> ErrorData {
    let detail = Some(json!({ "kind": err.kind() }));
    match &err {
        BridgeError::Peer(_) | BridgeError::WorldEditPolicy(_) => {
            ErrorData::invalid_request(err.to_string(), detail)
        }
        _ => ErrorData::internal_error(err.to_string(), detail),
    }
}

fn build_error_data(err: BuildError) -> ErrorData {
    let detail = Some(json!({ "kind": err.kind() }));
    match &err {
        BuildError::WorldEditUnavailable { .. } => {
            ErrorData::invalid_request(err.to_string(), detail)
        }
        BuildError::PlayerAnchorUnavailable(_) => {
            ErrorData::internal_error(err.to_string(), detail)
        }
        _ => ErrorData::invalid_params(err.to_string(), detail),
    }
}

fn catalog_error_data(err: CatalogError) -> ErrorData {
    let CatalogError::NotFound {
        kind,
        name,
        suggestions,
    } = &err;
    ErrorData::resource_not_found(
        err.to_string(),
        Some(json!({ "kind": kind, "name": name, "suggestions": suggestions })),
    )
}

#[tool_handler]
impl ServerHandler for VibeCraftMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "VibeCraft Minecraft bridge (tools: command.execute, server.info, player.position, player.context, player.entities, surface.level, screenshot.capture, region.scan, region.heightmap, palette.analyze, palette.region, light.analyze, symmetry.check, build.run, catalog.pattern, catalog.furniture, catalog.template, bridge.status)"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
