// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Build engine: normalizes build inputs (raw command list, sandboxed build
//! script, or schematic) into an ordered command stream, validates it up
//! front, optionally coalesces adjacent placements, and dispatches it through
//! the bridge one command at a time.
//!
//! Validation is atomic: if any command fails sanitization or the WorldEdit
//! policy, the whole build is rejected before anything is dispatched.
//! Dispatch is best-effort by default; `fail_fast` opts into aborting on the
//! first failed command.

mod coalesce;

use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use crate::bridge::{is_worldedit_command, normalize_command, Bridge, BridgeError};
use crate::config::{Config, WorldEditMode};
use crate::sandbox::{self, SandboxError};
use crate::sanitize::{sanitize_command, Policy, Rejection};
use crate::schematic::{self, Anchor, SchematicError};

pub use coalesce::coalesce_commands;

/// Exactly one source per build request.
#[derive(Debug, Clone)]
pub enum BuildSource {
    Commands(Vec<String>),
    Script(String),
    Schematic(Value),
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub source: BuildSource,
    pub description: String,
    pub preview_only: bool,
    pub fail_fast: bool,
    pub optimize: bool,
}

impl BuildRequest {
    pub fn new(source: BuildSource, description: impl Into<String>) -> Self {
        Self {
            source,
            description: description.into(),
            preview_only: false,
            fail_fast: false,
            optimize: true,
        }
    }
}

/// Per-command outcome, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok(String),
    Failed(String),
    SkippedPreview,
    SkippedAfterFailure,
}

impl CommandOutcome {
    pub fn label(&self) -> String {
        match self {
            Self::Ok(_) => "ok".to_owned(),
            Self::Failed(reason) => format!("failed: {reason}"),
            Self::SkippedPreview => "skipped: preview".to_owned(),
            Self::SkippedAfterFailure => "skipped: after failure".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildProgress {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub description: String,
    pub commands: Vec<(String, CommandOutcome)>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub preview: bool,
    pub warnings: Vec<String>,
}

impl BuildReport {
    /// Compact human-readable summary line.
    pub fn summary(&self) -> String {
        if self.preview {
            format!(
                "preview: {} command(s) for {:?}, none dispatched",
                self.commands.len(),
                self.description
            )
        } else {
            format!(
                "built {:?}: {}/{} ok, {} failed",
                self.description,
                self.succeeded,
                self.attempted,
                self.failed
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    EmptyBuild,
    Sanitization { command: String, rejection: Rejection },
    WorldEditUnavailable { command: String, mode: WorldEditMode },
    Sandbox(SandboxError),
    Schematic(SchematicError),
    PlayerAnchorUnavailable(String),
}

impl BuildError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyBuild => "empty_build",
            Self::Sanitization { .. } => "sanitization_rejected",
            Self::WorldEditUnavailable { .. } => "worldedit_policy",
            Self::Sandbox(_) => "sandbox_violation",
            Self::Schematic(_) => "schematic_malformed",
            Self::PlayerAnchorUnavailable(_) => "player_anchor_unavailable",
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBuild => f.write_str("build produced no commands"),
            Self::Sanitization { command, rejection } => {
                write!(f, "command {command:?} rejected ({}): {rejection}", rejection.rule())
            }
            Self::WorldEditUnavailable { command, mode } => write!(
                f,
                "large-region command {command:?} is not allowed under worldedit mode {mode}"
            ),
            Self::Sandbox(err) => write!(f, "build script rejected: {err}"),
            Self::Schematic(err) => write!(f, "schematic rejected: {err}"),
            Self::PlayerAnchorUnavailable(detail) => {
                write!(f, "anchor is \"player\" but the player position is unavailable: {detail}")
            }
        }
    }
}

impl std::error::Error for BuildError {}

impl From<SandboxError> for BuildError {
    fn from(err: SandboxError) -> Self {
        Self::Sandbox(err)
    }
}

impl From<SchematicError> for BuildError {
    fn from(err: SchematicError) -> Self {
        Self::Schematic(err)
    }
}

pub struct BuildEngine {
    bridge: Bridge,
    policy: Policy,
    worldedit_mode: WorldEditMode,
}

impl BuildEngine {
    pub fn new(bridge: Bridge, config: &Config) -> Self {
        Self {
            bridge,
            policy: Policy::from_config(config),
            worldedit_mode: config.worldedit_mode,
        }
    }

    /// Run one build. `progress` is invoked with cumulative counts after
    /// every dispatched command.
    pub async fn build(
        &self,
        request: BuildRequest,
        mut progress: impl FnMut(&BuildProgress),
    ) -> Result<BuildReport, BuildError> {
        let (mut commands, warnings) = self.normalize(&request).await?;
        if commands.is_empty() {
            return Err(BuildError::EmptyBuild);
        }

        if request.optimize {
            let before = commands.len();
            commands = coalesce_commands(commands);
            if commands.len() < before {
                debug!(before, after = commands.len(), "coalesced adjacent placements");
            }
        }

        // Atomic validation pass: sanitize every command and apply the
        // WorldEdit policy before anything reaches the bridge.
        for command in &commands {
            sanitize_command(command, &self.policy).map_err(|rejection| {
                BuildError::Sanitization {
                    command: command.clone(),
                    rejection,
                }
            })?;
            self.check_worldedit(command)?;
        }

        if request.preview_only {
            debug!(description = %request.description, count = commands.len(), "build preview");
            return Ok(BuildReport {
                description: request.description,
                attempted: 0,
                succeeded: 0,
                failed: 0,
                preview: true,
                warnings,
                commands: commands
                    .into_iter()
                    .map(|command| (command, CommandOutcome::SkippedPreview))
                    .collect(),
            });
        }

        info!(
            description = %request.description,
            count = commands.len(),
            "dispatching build"
        );

        let total = commands.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut counters = BuildProgress {
            total,
            ..BuildProgress::default()
        };
        let mut aborted = false;

        for command in commands {
            if aborted {
                outcomes.push((command, CommandOutcome::SkippedAfterFailure));
                continue;
            }

            counters.attempted += 1;
            let outcome = match self.bridge.execute_command(&command).await {
                Ok(report) => {
                    if report_indicates_failure(&report) {
                        counters.failed += 1;
                        CommandOutcome::Failed(report)
                    } else {
                        counters.succeeded += 1;
                        CommandOutcome::Ok(report)
                    }
                }
                Err(err) => {
                    counters.failed += 1;
                    CommandOutcome::Failed(err.to_string())
                }
            };

            let failed = matches!(outcome, CommandOutcome::Failed(_));
            outcomes.push((command, outcome));
            progress(&counters);

            if failed && request.fail_fast {
                aborted = true;
            }
        }

        Ok(BuildReport {
            description: request.description,
            attempted: counters.attempted,
            succeeded: counters.succeeded,
            failed: counters.failed,
            preview: false,
            warnings,
            commands: outcomes,
        })
    }

    async fn normalize(
        &self,
        request: &BuildRequest,
    ) -> Result<(Vec<String>, Vec<String>), BuildError> {
        match &request.source {
            BuildSource::Commands(commands) => Ok((
                commands.iter().map(|command| normalize_command(command)).collect(),
                Vec::new(),
            )),
            BuildSource::Script(source) => Ok((sandbox::run_build_script(source)?, Vec::new())),
            BuildSource::Schematic(value) => {
                let parsed = schematic::parse_schematic(value)?;
                let anchor = match parsed.anchor {
                    Anchor::Fixed(x, y, z) => (x, y, z),
                    Anchor::Player => self.resolve_player_anchor().await?,
                };
                let (commands, stats) = parsed.expand(anchor)?;
                Ok((commands, stats.warnings))
            }
        }
    }

    async fn resolve_player_anchor(&self) -> Result<(i64, i64, i64), BuildError> {
        let context = self
            .bridge
            .player_context(8.0)
            .await
            .map_err(|err: BridgeError| BuildError::PlayerAnchorUnavailable(err.to_string()))?;
        let block_position = context
            .get("block_position")
            .or_else(|| context.get("position"))
            .ok_or_else(|| {
                BuildError::PlayerAnchorUnavailable("player context has no position".to_owned())
            })?;
        let triple = triple_from_value(block_position).ok_or_else(|| {
            BuildError::PlayerAnchorUnavailable(format!("unparseable position: {block_position}"))
        })?;
        Ok(triple)
    }

    fn check_worldedit(&self, command: &str) -> Result<(), BuildError> {
        if !is_worldedit_command(command) {
            return Ok(());
        }
        match self.worldedit_mode {
            WorldEditMode::Force => Ok(()),
            WorldEditMode::Off => Err(BuildError::WorldEditUnavailable {
                command: command.to_owned(),
                mode: WorldEditMode::Off,
            }),
            WorldEditMode::Auto => {
                if self.bridge.capabilities().worldedit_available() == Some(true) {
                    Ok(())
                } else {
                    Err(BuildError::WorldEditUnavailable {
                        command: command.to_owned(),
                        mode: WorldEditMode::Auto,
                    })
                }
            }
        }
    }
}

fn triple_from_value(value: &Value) -> Option<(i64, i64, i64)> {
    if let Some(items) = value.as_array() {
        if items.len() == 3 {
            return Some((
                items[0].as_f64()?.floor() as i64,
                items[1].as_f64()?.floor() as i64,
                items[2].as_f64()?.floor() as i64,
            ));
        }
        return None;
    }
    let object = value.as_object()?;
    Some((
        object.get("x")?.as_f64()?.floor() as i64,
        object.get("y")?.as_f64()?.floor() as i64,
        object.get("z")?.as_f64()?.floor() as i64,
    ))
}

/// The helper reports command execution as free text; treat the usual game
/// error phrasings as failures.
fn report_indicates_failure(report: &str) -> bool {
    let lowered = report.to_ascii_lowercase();
    ["error", "unknown", "incorrect", "invalid", "cannot"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

#[cfg(test)]
mod tests;
