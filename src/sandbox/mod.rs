// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Sandboxed build-script execution.
//!
//! Build scripts use a deliberately narrow, Python-shaped surface: `for`
//! loops, `if`/`elif`/`else`, arithmetic and list expressions, f-strings, and
//! an allowlisted set of pure builtins plus a math namespace. The script must
//! leave a `commands` variable holding a list of command strings.
//!
//! The surface is enforced structurally: the grammar simply has no function
//! definitions, imports, or attribute access beyond list `append`/`extend`.
//! The interpreter enforces resource quotas at runtime: aggregate loop
//! iterations, per-`range` size, produced command count, and wall clock.

mod interp;
mod lexer;
mod parser;

use std::fmt;
use std::time::{Duration, Instant};

pub use interp::Value;

/// Resource quotas for one script execution.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_source_length: usize,
    pub max_nesting_depth: usize,
    pub max_iterations: u64,
    pub max_range_size: i64,
    pub max_commands: usize,
    pub max_command_length: usize,
    pub timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_source_length: 50_000,
            max_nesting_depth: 10,
            max_iterations: 100_000,
            max_range_size: 10_000,
            max_commands: 10_000,
            max_command_length: 1000,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Server verbs a generated command may never contain, regardless of the
/// process-level sanitizer policy.
pub const BLOCKED_COMMAND_PATTERNS: [&str; 10] = [
    "stop",
    "ban",
    "kick",
    "op ",
    "deop",
    "whitelist",
    "save-all",
    "save-off",
    "save-on",
    "reload",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SandboxError {
    SourceTooLong {
        length: usize,
        max: usize,
    },
    Syntax {
        line: usize,
        message: String,
    },
    DeniedConstruct {
        line: usize,
        construct: String,
    },
    BlockedName {
        line: usize,
        name: String,
    },
    NestingTooDeep {
        line: usize,
        max: usize,
    },
    RangeTooLarge {
        line: usize,
        size: i64,
        max: i64,
    },
    IterationBudgetExceeded {
        max: u64,
    },
    Timeout {
        limit: Duration,
    },
    Runtime {
        line: usize,
        message: String,
    },
    OutputNotAList {
        found: String,
    },
    TooManyCommands {
        count: usize,
        max: usize,
    },
    BadCommand {
        index: usize,
        reason: String,
    },
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceTooLong { length, max } => {
                write!(f, "script too long: {length} chars exceeds maximum {max}")
            }
            Self::Syntax { line, message } => write!(f, "syntax error on line {line}: {message}"),
            Self::DeniedConstruct { line, construct } => {
                write!(f, "denied construct on line {line}: {construct}")
            }
            Self::BlockedName { line, name } => {
                write!(f, "blocked name on line {line}: {name:?} is not allowed")
            }
            Self::NestingTooDeep { line, max } => {
                write!(f, "nesting too deep on line {line}: maximum depth is {max}")
            }
            Self::RangeTooLarge { line, size, max } => {
                write!(f, "range on line {line} spans {size} values, maximum is {max}")
            }
            Self::IterationBudgetExceeded { max } => {
                write!(f, "script exceeded the aggregate iteration budget of {max}")
            }
            Self::Timeout { limit } => {
                write!(f, "script execution timed out after {:.1}s", limit.as_secs_f64())
            }
            Self::Runtime { line, message } => write!(f, "runtime error on line {line}: {message}"),
            Self::OutputNotAList { found } => write!(
                f,
                "script must leave a 'commands' list of strings; found {found}"
            ),
            Self::TooManyCommands { count, max } => {
                write!(f, "script produced {count} commands, maximum is {max}")
            }
            Self::BadCommand { index, reason } => {
                write!(f, "generated command {index} is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for SandboxError {}

/// Execute a build script and return the command list it produced.
pub fn run_build_script(source: &str) -> Result<Vec<String>, SandboxError> {
    run_build_script_with_limits(source, &Limits::default())
}

pub fn run_build_script_with_limits(
    source: &str,
    limits: &Limits,
) -> Result<Vec<String>, SandboxError> {
    if source.len() > limits.max_source_length {
        return Err(SandboxError::SourceTooLong {
            length: source.len(),
            max: limits.max_source_length,
        });
    }

    let program = parser::parse(source, limits.max_nesting_depth)?;
    let deadline = Instant::now() + limits.timeout;
    let env = interp::run(&program, limits, deadline)?;

    let commands = match env.get("commands") {
        Some(Value::List(list)) => list.borrow().clone(),
        Some(other) => {
            return Err(SandboxError::OutputNotAList {
                found: other.type_name().to_owned(),
            });
        }
        None => {
            return Err(SandboxError::OutputNotAList {
                found: "no 'commands' variable".to_owned(),
            });
        }
    };

    if commands.len() > limits.max_commands {
        return Err(SandboxError::TooManyCommands {
            count: commands.len(),
            max: limits.max_commands,
        });
    }

    let mut validated = Vec::with_capacity(commands.len());
    for (index, value) in commands.iter().enumerate() {
        let Value::Str(raw) = value else {
            return Err(SandboxError::BadCommand {
                index,
                reason: format!("expected a string, found {}", value.type_name()),
            });
        };
        let command = raw.trim().to_owned();
        if command.len() > limits.max_command_length {
            return Err(SandboxError::BadCommand {
                index,
                reason: format!(
                    "command is {} chars, maximum is {}",
                    command.len(),
                    limits.max_command_length
                ),
            });
        }
        if !command.starts_with('/') {
            return Err(SandboxError::BadCommand {
                index,
                reason: format!("command does not start with '/': {command}"),
            });
        }
        let lowered = command.to_ascii_lowercase();
        if let Some(pattern) =
            BLOCKED_COMMAND_PATTERNS.iter().find(|pattern| lowered.contains(*pattern))
        {
            return Err(SandboxError::BadCommand {
                index,
                reason: format!("command contains blocked pattern {pattern:?}"),
            });
        }
        validated.push(command);
    }

    Ok(validated)
}
