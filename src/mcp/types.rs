// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CommandExecuteParams {
    /// Game command, with or without the leading slash.
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandExecuteResponse {
    pub command: String,
    pub report: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServerInfoResponse {
    pub info: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlayerPositionResponse {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub block_x: i64,
    pub block_y: i64,
    pub block_z: i64,
    pub dimension: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PlayerContextParams {
    /// Ray-cast reach in blocks; defaults to 128.
    pub reach: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlayerContextResponse {
    pub context: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NearbyEntitiesParams {
    /// Search radius in blocks; defaults to 32, capped at 128.
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NearbyEntitiesResponse {
    pub entities: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SurfaceLevelParams {
    pub x: i64,
    pub z: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SurfaceLevelResponse {
    pub x: i64,
    pub z: i64,
    /// Y of the highest non-air block, when the column resolved.
    pub surface_y: Option<i64>,
    pub surface_block: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScreenshotParams {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScreenshotResponse {
    pub screenshot: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegionScanParams {
    pub x1: i64,
    pub y1: i64,
    pub z1: i64,
    pub x2: i64,
    pub y2: i64,
    pub z2: i64,
    /// Include block-state suffixes in palette entries.
    pub include_states: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegionScanResponse {
    pub origin: [i64; 3],
    pub dimensions: [i64; 3],
    pub palette: Vec<String>,
    /// RLE sequence: a bare palette index, or `[index, count]` runs.
    pub blocks: Value,
    pub total_blocks: u64,
    pub unique_blocks: u64,
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct HeightmapParams {
    pub x1: i64,
    pub z1: i64,
    pub x2: i64,
    pub z2: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeightmapResponse {
    pub heightmap: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PaletteAnalyzeParams {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    /// Spherical radius; defaults to 16, capped at 64.
    pub radius: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaletteAnalyzeResponse {
    pub palette: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PaletteRegionParams {
    pub x1: i64,
    pub y1: i64,
    pub z1: i64,
    pub x2: i64,
    pub y2: i64,
    pub z2: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LightAnalyzeParams {
    pub x1: i64,
    pub y1: i64,
    pub z1: i64,
    pub x2: i64,
    pub y2: i64,
    pub z2: i64,
    /// Sampling stride, clamped to 1..=4.
    pub resolution: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LightAnalyzeResponse {
    pub analysis: Value,
    pub resolution: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SymmetryCheckParams {
    pub x1: i64,
    pub y1: i64,
    pub z1: i64,
    pub x2: i64,
    pub y2: i64,
    pub z2: i64,
    /// Mirror axis: "x", "y", or "z".
    pub axis: String,
    /// Fraction of mismatching cells tolerated before the verdict flips.
    pub tolerance: Option<f64>,
    /// Sampling stride, clamped to 1..=4.
    pub resolution: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SymmetryCheckResponse {
    pub analysis: Value,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct BuildParams {
    /// Raw command list. Exactly one of `commands`, `code`, `schematic`.
    pub commands: Option<Vec<String>>,
    /// Build-script source for the sandbox.
    pub code: Option<String>,
    /// Declarative schematic (compact or verbose form).
    pub schematic: Option<Value>,
    pub preview_only: Option<bool>,
    pub description: Option<String>,
    /// Abort on the first failed command instead of continuing.
    pub fail_fast: Option<bool>,
    /// Coalesce adjacent single-block placements into fills.
    pub optimize: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandReport {
    pub command: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BuildResponse {
    pub description: String,
    pub preview: bool,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub summary: String,
    pub outcomes: Vec<CommandReport>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CatalogLookupParams {
    /// Entry name for an exact lookup; omit to list.
    pub name: Option<String>,
    /// Category filter applied when listing.
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogEntryView {
    pub name: String,
    pub category: String,
    pub description: String,
    pub schematic: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogResponse {
    pub entries: Vec<CatalogEntryView>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BridgeStatusResponse {
    pub endpoint: String,
    pub state: String,
    pub consecutive_failures: u32,
    pub backoff_remaining_secs: Option<f64>,
    pub auth_failed: bool,
    pub capabilities: Value,
}
