// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Process configuration, loaded once from `VIBECRAFT_*` environment variables
//! and frozen for the lifetime of the process.

use std::fmt;
use std::time::Duration;

pub const DEFAULT_BRIDGE_HOST: &str = "127.0.0.1";
pub const DEFAULT_BRIDGE_PORT: u16 = 8766;
pub const DEFAULT_BRIDGE_PATH: &str = "/vibecraft";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_COMMAND_LENGTH: usize = 1000;

/// Policy switch for large-region (`//…`) command emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEditMode {
    /// Emit large-region commands only when the peer reports the capability.
    Auto,
    /// Emit them regardless; errors surface from the peer.
    Force,
    /// Never emit them.
    Off,
}

impl WorldEditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Force => "force",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for WorldEditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned bounding box for permitted build coordinates, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildBox {
    pub min: (i64, i64, i64),
    pub max: (i64, i64, i64),
}

impl BuildBox {
    pub fn contains(&self, x: i64, y: i64, z: i64) -> bool {
        x >= self.min.0
            && x <= self.max.0
            && y >= self.min.1
            && y <= self.max.1
            && z >= self.min.2
            && z <= self.max.2
    }
}

/// Frozen configuration record. Created once at startup and shared by
/// reference; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bridge_host: String,
    pub bridge_port: u16,
    pub bridge_path: String,
    pub bridge_token: Option<String>,
    pub request_timeout: Duration,
    pub worldedit_mode: WorldEditMode,
    pub safety_checks: bool,
    pub allow_dangerous: bool,
    pub max_command_length: usize,
    pub build_box: Option<BuildBox>,
    pub command_logging: bool,
    pub version_detection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bridge_host: DEFAULT_BRIDGE_HOST.to_owned(),
            bridge_port: DEFAULT_BRIDGE_PORT,
            bridge_path: DEFAULT_BRIDGE_PATH.to_owned(),
            bridge_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            worldedit_mode: WorldEditMode::Auto,
            safety_checks: true,
            allow_dangerous: false,
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH,
            build_box: None,
            command_logging: true,
            version_detection: true,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup. The lookup
    /// indirection keeps the parsing testable without touching process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(host) = lookup("VIBECRAFT_BRIDGE_HOST") {
            config.bridge_host = host;
        }
        if let Some(raw) = lookup("VIBECRAFT_BRIDGE_PORT") {
            config.bridge_port = parse_var("VIBECRAFT_BRIDGE_PORT", &raw)?;
        }
        if let Some(path) = lookup("VIBECRAFT_BRIDGE_PATH") {
            config.bridge_path =
                if path.starts_with('/') { path } else { format!("/{path}") };
        }
        config.bridge_token = lookup("VIBECRAFT_BRIDGE_TOKEN").filter(|token| !token.is_empty());

        if let Some(raw) = lookup("VIBECRAFT_REQUEST_TIMEOUT") {
            let secs: u64 = parse_var("VIBECRAFT_REQUEST_TIMEOUT", &raw)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    variable: "VIBECRAFT_REQUEST_TIMEOUT",
                    value: raw,
                    reason: "timeout must be at least 1 second".to_owned(),
                });
            }
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = lookup("VIBECRAFT_WORLDEDIT_MODE") {
            config.worldedit_mode = match raw.to_ascii_lowercase().as_str() {
                "auto" => WorldEditMode::Auto,
                "force" => WorldEditMode::Force,
                "off" => WorldEditMode::Off,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        variable: "VIBECRAFT_WORLDEDIT_MODE",
                        value: raw,
                        reason: "expected auto|force|off".to_owned(),
                    });
                }
            };
        }

        if let Some(raw) = lookup("VIBECRAFT_SAFETY_CHECKS") {
            config.safety_checks = parse_bool("VIBECRAFT_SAFETY_CHECKS", &raw)?;
        }
        if let Some(raw) = lookup("VIBECRAFT_ALLOW_DANGEROUS") {
            config.allow_dangerous = parse_bool("VIBECRAFT_ALLOW_DANGEROUS", &raw)?;
        }
        if let Some(raw) = lookup("VIBECRAFT_MAX_COMMAND_LENGTH") {
            let length: usize = parse_var("VIBECRAFT_MAX_COMMAND_LENGTH", &raw)?;
            if length == 0 {
                return Err(ConfigError::InvalidValue {
                    variable: "VIBECRAFT_MAX_COMMAND_LENGTH",
                    value: raw,
                    reason: "length must be positive".to_owned(),
                });
            }
            config.max_command_length = length;
        }
        if let Some(raw) = lookup("VIBECRAFT_COMMAND_LOGGING") {
            config.command_logging = parse_bool("VIBECRAFT_COMMAND_LOGGING", &raw)?;
        }
        if let Some(raw) = lookup("VIBECRAFT_VERSION_DETECTION") {
            config.version_detection = parse_bool("VIBECRAFT_VERSION_DETECTION", &raw)?;
        }

        config.build_box = parse_build_box(&lookup)?;

        Ok(config)
    }

    /// WebSocket endpoint of the game-client helper.
    pub fn bridge_endpoint(&self) -> String {
        format!("ws://{}:{}{}", self.bridge_host, self.bridge_port, self.bridge_path)
    }
}

const BOX_VARIABLES: [(&str, &str); 3] = [
    ("VIBECRAFT_BUILD_MIN_X", "VIBECRAFT_BUILD_MAX_X"),
    ("VIBECRAFT_BUILD_MIN_Y", "VIBECRAFT_BUILD_MAX_Y"),
    ("VIBECRAFT_BUILD_MIN_Z", "VIBECRAFT_BUILD_MAX_Z"),
];

fn parse_build_box(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<BuildBox>, ConfigError> {
    let mut bounds: [Option<(i64, i64)>; 3] = [None; 3];
    let mut any = false;

    for (axis, (min_name, max_name)) in BOX_VARIABLES.iter().enumerate() {
        let min = lookup(min_name).map(|raw| parse_var::<i64>(min_name, &raw)).transpose()?;
        let max = lookup(max_name).map(|raw| parse_var::<i64>(max_name, &raw)).transpose()?;
        match (min, max) {
            (None, None) => {}
            (Some(min), Some(max)) => {
                if min > max {
                    return Err(ConfigError::ConflictingBounds {
                        variable: min_name,
                        min,
                        max,
                    });
                }
                bounds[axis] = Some((min, max));
                any = true;
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingBound { variable: max_name });
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingBound { variable: min_name });
            }
        }
    }

    if !any {
        return Ok(None);
    }
    match bounds {
        [Some(x), Some(y), Some(z)] => Ok(Some(BuildBox {
            min: (x.0, y.0, z.0),
            max: (x.1, y.1, z.1),
        })),
        _ => Err(ConfigError::PartialBuildBox),
    }
}

fn parse_var<T: std::str::FromStr>(variable: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        variable,
        value: raw.to_owned(),
        reason: "not a valid number".to_owned(),
    })
}

fn parse_bool(variable: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            variable,
            value: raw.to_owned(),
            reason: "expected a boolean (true/false/1/0)".to_owned(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
    ConflictingBounds {
        variable: &'static str,
        min: i64,
        max: i64,
    },
    MissingBound {
        variable: &'static str,
    },
    PartialBuildBox,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue {
                variable,
                value,
                reason,
            } => write!(f, "invalid value for {variable}: {value:?} ({reason})"),
            Self::ConflictingBounds { variable, min, max } => {
                write!(f, "conflicting bounds for {variable}: min {min} exceeds max {max}")
            }
            Self::MissingBound { variable } => {
                write!(f, "incomplete build box: {variable} is not set")
            }
            Self::PartialBuildBox => {
                f.write_str("incomplete build box: all six VIBECRAFT_BUILD_* bounds are required")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
