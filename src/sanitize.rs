// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Command safety policy.
//!
//! A pure predicate over a single command string. Every command-producing path
//! routes through [`sanitize_command`] exactly once, immediately before
//! dispatch; nothing else in the process enforces safety policy.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::{BuildBox, Config};

/// Destructive operations rejected unless dangerous commands are allowed.
///
/// The set is closed: world regeneration, chunk deletion, the catch-all
/// remove-above/below/near sweeps, and the op/deop/stop administrative verbs.
pub const DANGEROUS_VERBS: [&str; 8] = [
    "regen",
    "delchunks",
    "removeabove",
    "removebelow",
    "removenear",
    "op",
    "deop",
    "stop",
];

/// Active safety policy, derived from [`Config`] at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub safety_checks: bool,
    pub allow_dangerous: bool,
    pub max_command_length: usize,
    pub build_box: Option<BuildBox>,
}

impl Policy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            safety_checks: config.safety_checks,
            allow_dangerous: config.allow_dangerous,
            max_command_length: config.max_command_length,
            build_box: config.build_box,
        }
    }
}

/// Why a command was rejected. Carries the rule name and the offending input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    TooLong {
        length: usize,
        max: usize,
    },
    UnbalancedQuotes {
        command: String,
    },
    ControlCharacter {
        command: String,
    },
    ShellMetacharacter {
        command: String,
        pattern: &'static str,
    },
    DangerousOperation {
        command: String,
        verb: String,
    },
    OutOfBounds {
        command: String,
        triple: (i64, i64, i64),
    },
}

impl Rejection {
    /// Stable rule identifier surfaced to the agent.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Empty => "empty command",
            Self::TooLong { .. } => "command too long",
            Self::UnbalancedQuotes { .. } => "unbalanced quotes",
            Self::ControlCharacter { .. } => "control character",
            Self::ShellMetacharacter { .. } => "shell metacharacter",
            Self::DangerousOperation { .. } => "dangerous operation",
            Self::OutOfBounds { .. } => "outside build box",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("command is empty after trimming"),
            Self::TooLong { length, max } => {
                write!(f, "command length {length} exceeds maximum {max}")
            }
            Self::UnbalancedQuotes { command } => {
                write!(f, "unbalanced quoting in command: {command}")
            }
            Self::ControlCharacter { command } => {
                write!(f, "newline or null character in command: {command:?}")
            }
            Self::ShellMetacharacter { command, pattern } => {
                write!(f, "shell metacharacter {pattern:?} in command: {command}")
            }
            Self::DangerousOperation { command, verb } => {
                write!(f, "dangerous operation {verb:?} is not allowed: {command}")
            }
            Self::OutOfBounds { command, triple } => write!(
                f,
                "coordinate ({}, {}, {}) lies outside the configured build box: {command}",
                triple.0, triple.1, triple.2
            ),
        }
    }
}

impl std::error::Error for Rejection {}

/// Apply the active policy to a single command string.
///
/// Checks run in a fixed order and short-circuit on the first failure:
/// length, syntactic safety, dangerous-verb denylist, build-box coordinates.
pub fn sanitize_command(command: &str, policy: &Policy) -> Result<(), Rejection> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }
    if trimmed.len() > policy.max_command_length {
        return Err(Rejection::TooLong {
            length: trimmed.len(),
            max: policy.max_command_length,
        });
    }

    if policy.safety_checks {
        check_syntax(trimmed)?;
    }

    if !policy.allow_dangerous {
        check_dangerous(trimmed)?;
    }

    if let Some(build_box) = &policy.build_box {
        check_bounds(trimmed, build_box)?;
    }

    Ok(())
}

/// Syntactic filter only; this is not an authorization check.
fn check_syntax(command: &str) -> Result<(), Rejection> {
    if command.chars().any(|c| c == '\n' || c == '\r' || c == '\0') {
        return Err(Rejection::ControlCharacter {
            command: command.to_owned(),
        });
    }

    for (pattern, needle) in [("`", "`"), ("$(", "$("), (";", ";"), ("&&", "&&"), ("||", "||")] {
        if command.contains(needle) {
            return Err(Rejection::ShellMetacharacter {
                command: command.to_owned(),
                pattern,
            });
        }
    }

    let double = command.matches('"').count();
    if double % 2 != 0 {
        return Err(Rejection::UnbalancedQuotes {
            command: command.to_owned(),
        });
    }
    let single = command.matches('\'').count();
    if single % 2 != 0 {
        return Err(Rejection::UnbalancedQuotes {
            command: command.to_owned(),
        });
    }

    Ok(())
}

fn check_dangerous(command: &str) -> Result<(), Rejection> {
    let verb = command
        .trim_start_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    if DANGEROUS_VERBS.contains(&verb.as_str()) {
        return Err(Rejection::DangerousOperation {
            command: command.to_owned(),
            verb,
        });
    }
    Ok(())
}

fn vanilla_triple_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(-?\d+)\s+(-?\d+)\s+(-?\d+)").expect("static pattern compiles")
    })
}

fn region_triple_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(-?\d+),(-?\d+),(-?\d+)").expect("static pattern compiles"))
}

/// Best-effort coordinate guard. Every parseable integer triple (`x y z` in
/// vanilla commands, `x,y,z` in large-region commands) must fall inside the
/// box. Unparseable numerics are not treated as evidence of violation.
fn check_bounds(command: &str, build_box: &BuildBox) -> Result<(), Rejection> {
    let pattern = if command.starts_with("//") {
        region_triple_pattern()
    } else {
        vanilla_triple_pattern()
    };

    for captures in pattern.captures_iter(command) {
        let parsed = (
            captures[1].parse::<i64>(),
            captures[2].parse::<i64>(),
            captures[3].parse::<i64>(),
        );
        if let (Ok(x), Ok(y), Ok(z)) = parsed {
            if !build_box.contains(x, y, z) {
                return Err(Rejection::OutOfBounds {
                    command: command.to_owned(),
                    triple: (x, y, z),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_policy() -> Policy {
        Policy {
            safety_checks: true,
            allow_dangerous: false,
            max_command_length: 1000,
            build_box: None,
        }
    }

    #[test]
    fn accepts_basic_command() {
        sanitize_command("/list", &open_policy()).expect("accepted");
        sanitize_command("/setblock 100 64 200 stone", &open_policy()).expect("accepted");
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(sanitize_command("", &open_policy()), Err(Rejection::Empty));
        assert_eq!(sanitize_command("   ", &open_policy()), Err(Rejection::Empty));
    }

    #[test]
    fn rejects_over_length() {
        let mut policy = open_policy();
        policy.max_command_length = 10;
        let err = sanitize_command("/fill 0 0 0 100 100 100 stone", &policy).unwrap_err();
        assert!(matches!(err, Rejection::TooLong { max: 10, .. }));
    }

    #[test]
    fn rejects_control_characters() {
        let err = sanitize_command("/say hi\nthere", &open_policy()).unwrap_err();
        assert_eq!(err.rule(), "control character");
    }

    #[test]
    fn rejects_shell_metacharacters() {
        for command in ["/say `whoami`", "/say $(id)", "/say a; b", "/say a && b"] {
            let err = sanitize_command(command, &open_policy()).unwrap_err();
            assert_eq!(err.rule(), "shell metacharacter", "command: {command}");
        }
    }

    #[test]
    fn rejects_unbalanced_quotes() {
        let err = sanitize_command("/say \"unterminated", &open_policy()).unwrap_err();
        assert_eq!(err.rule(), "unbalanced quotes");
        sanitize_command("/say \"balanced\"", &open_policy()).expect("accepted");
    }

    #[test]
    fn syntax_filter_is_skippable() {
        let mut policy = open_policy();
        policy.safety_checks = false;
        sanitize_command("/say a; b", &policy).expect("accepted without safety checks");
    }

    #[test]
    fn rejects_dangerous_verbs() {
        for command in ["//regen", "/op somebody", "/stop", "//delchunks", "/deop somebody"] {
            let err = sanitize_command(command, &open_policy()).unwrap_err();
            assert_eq!(err.rule(), "dangerous operation", "command: {command}");
        }
    }

    #[test]
    fn dangerous_verbs_allowed_when_opted_in() {
        let mut policy = open_policy();
        policy.allow_dangerous = true;
        sanitize_command("//regen", &policy).expect("accepted with opt-in");
    }

    #[test]
    fn dangerous_check_matches_first_token_only() {
        // "stop" appearing as an argument is not the stop verb.
        sanitize_command("/say stop", &open_policy()).expect("accepted");
    }

    #[test]
    fn bounds_guard_vanilla_triples() {
        let mut policy = open_policy();
        policy.build_box = Some(BuildBox {
            min: (-100, 0, -100),
            max: (100, 255, 100),
        });

        sanitize_command("/setblock 50 64 50 stone", &policy).expect("inside box");
        let err = sanitize_command("/setblock 500 64 50 stone", &policy).unwrap_err();
        assert!(matches!(err, Rejection::OutOfBounds { triple: (500, 64, 50), .. }));
    }

    #[test]
    fn bounds_guard_region_triples() {
        let mut policy = open_policy();
        policy.build_box = Some(BuildBox {
            min: (-100, 0, -100),
            max: (100, 255, 100),
        });

        sanitize_command("//pos1 10,64,10", &policy).expect("inside box");
        let err = sanitize_command("//pos1 10,300,10", &policy).unwrap_err();
        assert_eq!(err.rule(), "outside build box");
    }

    #[test]
    fn bounds_guard_ignores_unparseable_numerics() {
        let mut policy = open_policy();
        policy.build_box = Some(BuildBox {
            min: (-10, -10, -10),
            max: (10, 10, 10),
        });
        // Relative coordinates carry no absolute triple; best-effort parsing
        // must not reject them.
        sanitize_command("/setblock ~ ~1 ~ stone", &policy).expect("accepted");
    }

    #[test]
    fn checks_short_circuit_in_order() {
        // A dangerous verb with a metacharacter fails on the syntactic rule
        // first because safety checks run before the denylist.
        let err = sanitize_command("/stop; echo", &open_policy()).unwrap_err();
        assert_eq!(err.rule(), "shell metacharacter");
    }
}
