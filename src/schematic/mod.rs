// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Declarative structure schematics.
//!
//! A schematic describes a build as layered grids of palette symbols. Both the
//! compact form (`a`/`p`/`l`/`f`/`m`/`s` keys, RLE row strings, shape
//! primitives) and the verbose form (`anchor`/`palette`/`layers` with explicit
//! grids) are accepted; parsing normalizes everything into [`Schematic`].
//! Expansion is deterministic: identical schematic plus identical resolved
//! anchor yields a byte-identical command sequence.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Symbols that always mean "air" and are skipped during expansion.
pub const AIR_SYMBOLS: [&str; 3] = [".", "_", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Resolve to the player's position once, at expansion start.
    Player,
    Fixed(i64, i64, i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    North,
    East,
    South,
    West,
}

impl Facing {
    /// Clockwise quarter turns away from north.
    pub fn rotation_steps(&self) -> usize {
        match self {
            Self::North => 0,
            Self::East => 1,
            Self::South => 2,
            Self::West => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    Replace,
    Keep,
    Destroy,
}

impl PlacementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Keep => "keep",
            Self::Destroy => "destroy",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub y_offset: i64,
    pub grid: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schematic {
    pub anchor: Anchor,
    pub facing: Facing,
    pub mode: PlacementMode,
    pub palette: BTreeMap<String, String>,
    pub layers: Vec<Layer>,
    /// Non-fatal oddities found while parsing (unknown facing, unknown mode).
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandStats {
    pub blocks_placed: usize,
    pub layers: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchematicError {
    NotAnObject,
    InvalidAnchor {
        detail: String,
    },
    NoLayers,
    InvalidLayer {
        index: usize,
        reason: String,
    },
    InvalidRange {
        raw: String,
    },
    InvalidShape {
        raw: String,
    },
    UnknownSymbol {
        symbol: String,
        y_offset: i64,
    },
    InvalidRepeat {
        raw: String,
    },
}

impl fmt::Display for SchematicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("schematic must be a JSON object"),
            Self::InvalidAnchor { detail } => write!(
                f,
                "invalid anchor: {detail} (expected [x, y, z] or \"player\")"
            ),
            Self::NoLayers => f.write_str("schematic defines no layers and no shape"),
            Self::InvalidLayer { index, reason } => {
                write!(f, "invalid layer at index {index}: {reason}")
            }
            Self::InvalidRange { raw } => {
                write!(f, "invalid layer range {raw:?} (expected an integer or \"i-j\")")
            }
            Self::InvalidShape { raw } => write!(
                f,
                "invalid shape {raw:?} (expected fill/outline/frame/walls:WxD:S or box/room:WxHxD:S)"
            ),
            Self::UnknownSymbol { symbol, y_offset } => write!(
                f,
                "palette symbol {symbol:?} at layer y={y_offset} is not defined"
            ),
            Self::InvalidRepeat { raw } => {
                write!(f, "invalid repeat count in row token {raw:?}")
            }
        }
    }
}

impl std::error::Error for SchematicError {}

// ---- parsing ----------------------------------------------------------------

pub fn parse_schematic(value: &Value) -> Result<Schematic, SchematicError> {
    let object = value.as_object().ok_or(SchematicError::NotAnObject)?;
    let mut warnings = Vec::new();

    let get = |long: &str, short: &str| object.get(long).or_else(|| object.get(short));

    let anchor = match get("anchor", "a") {
        None => Anchor::Fixed(0, 64, 0),
        Some(Value::String(tag)) if tag == "player" => Anchor::Player,
        Some(Value::Array(items)) if items.len() == 3 => {
            let mut coords = [0i64; 3];
            for (slot, item) in coords.iter_mut().zip(items.iter()) {
                *slot = item.as_i64().ok_or_else(|| SchematicError::InvalidAnchor {
                    detail: item.to_string(),
                })?;
            }
            Anchor::Fixed(coords[0], coords[1], coords[2])
        }
        Some(other) => {
            return Err(SchematicError::InvalidAnchor {
                detail: other.to_string(),
            });
        }
    };

    let facing = match get("facing", "f").and_then(Value::as_str) {
        None => Facing::North,
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "north" => Facing::North,
            "east" => Facing::East,
            "south" => Facing::South,
            "west" => Facing::West,
            other => {
                warnings.push(format!("unknown facing {other:?}, using north"));
                Facing::North
            }
        },
    };

    let mode = match get("mode", "m").and_then(Value::as_str) {
        None => PlacementMode::Replace,
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "replace" => PlacementMode::Replace,
            "keep" => PlacementMode::Keep,
            "destroy" => PlacementMode::Destroy,
            other => {
                warnings.push(format!("unknown mode {other:?}, using replace"));
                PlacementMode::Replace
            }
        },
    };

    let mut palette: BTreeMap<String, String> = AIR_SYMBOLS
        .iter()
        .map(|symbol| ((*symbol).to_owned(), "air".to_owned()))
        .collect();
    if let Some(Value::Object(user_palette)) = get("palette", "p") {
        for (symbol, block) in user_palette {
            if let Some(block) = block.as_str() {
                palette.insert(symbol.clone(), block.to_owned());
            }
        }
    }

    let layers = if let Some(layers_value) = get("layers", "l") {
        parse_layers(layers_value)?
    } else if let Some(shape_value) = get("shape", "s").and_then(Value::as_str) {
        generate_3d_shape_layers(shape_value)?
    } else {
        return Err(SchematicError::NoLayers);
    };
    if layers.is_empty() {
        return Err(SchematicError::NoLayers);
    }

    Ok(Schematic {
        anchor,
        facing,
        mode,
        palette,
        layers,
        warnings,
    })
}

fn parse_layers(value: &Value) -> Result<Vec<Layer>, SchematicError> {
    let entries = value.as_array().ok_or_else(|| SchematicError::InvalidLayer {
        index: 0,
        reason: "layers must be an array".to_owned(),
    })?;

    let mut layers = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        match entry {
            // Compact form: [y_or_range, "row|row~2|fill:WxD:S"]
            Value::Array(pair) if pair.len() == 2 => {
                let y_values = parse_y_range(&pair[0])?;
                let row_string =
                    pair[1].as_str().ok_or_else(|| SchematicError::InvalidLayer {
                        index,
                        reason: "second element must be a row string".to_owned(),
                    })?;
                let grid = parse_row_string(row_string)?;
                for y_offset in y_values {
                    layers.push(Layer {
                        y_offset,
                        grid: grid.clone(),
                    });
                }
            }
            Value::Object(map) => {
                let y_offset = map.get("y").and_then(Value::as_i64).unwrap_or(0);
                if let Some(rows) = map.get("rows").and_then(Value::as_array) {
                    let mut grid = Vec::new();
                    for row in rows {
                        match row {
                            Value::String(raw) => grid.extend(parse_raw_row(raw)?),
                            Value::Array(symbols) => {
                                grid.push(symbols_from_array(symbols, index)?)
                            }
                            other => {
                                return Err(SchematicError::InvalidLayer {
                                    index,
                                    reason: format!("unsupported row value: {other}"),
                                });
                            }
                        }
                    }
                    layers.push(Layer { y_offset, grid });
                } else if let Some(grid_rows) = map.get("grid").and_then(Value::as_array) {
                    let mut grid = Vec::new();
                    for row in grid_rows {
                        let symbols =
                            row.as_array().ok_or_else(|| SchematicError::InvalidLayer {
                                index,
                                reason: "grid rows must be arrays of symbols".to_owned(),
                            })?;
                        grid.push(symbols_from_array(symbols, index)?);
                    }
                    layers.push(Layer { y_offset, grid });
                } else {
                    return Err(SchematicError::InvalidLayer {
                        index,
                        reason: "layer object needs a 'rows' or 'grid' key".to_owned(),
                    });
                }
            }
            other => {
                return Err(SchematicError::InvalidLayer {
                    index,
                    reason: format!("unsupported layer value: {other}"),
                });
            }
        }
    }
    Ok(layers)
}

fn symbols_from_array(
    symbols: &[Value],
    layer_index: usize,
) -> Result<Vec<String>, SchematicError> {
    symbols
        .iter()
        .map(|symbol| {
            symbol
                .as_str()
                .map(ToOwned::to_owned)
                .ok_or_else(|| SchematicError::InvalidLayer {
                    index: layer_index,
                    reason: format!("grid cells must be strings, found {symbol}"),
                })
        })
        .collect()
}

/// `0`, `"3"`, or `"1-3"` (inclusive).
fn parse_y_range(value: &Value) -> Result<Vec<i64>, SchematicError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(|y| vec![y])
            .ok_or_else(|| SchematicError::InvalidRange {
                raw: number.to_string(),
            }),
        Value::String(raw) => {
            if let Some((start, end)) = split_range(raw) {
                if start > end {
                    return Err(SchematicError::InvalidRange { raw: raw.clone() });
                }
                Ok((start..=end).collect())
            } else {
                raw.trim()
                    .parse::<i64>()
                    .map(|y| vec![y])
                    .map_err(|_| SchematicError::InvalidRange { raw: raw.clone() })
            }
        }
        other => Err(SchematicError::InvalidRange {
            raw: other.to_string(),
        }),
    }
}

/// Split `"i-j"` on the dash that separates the two bounds; the first bound
/// may itself be negative.
fn split_range(raw: &str) -> Option<(i64, i64)> {
    let trimmed = raw.trim();
    let dash = trimmed.char_indices().skip(1).find(|(_, ch)| *ch == '-')?.0;
    let start: i64 = trimmed[..dash].trim().parse().ok()?;
    let end: i64 = trimmed[dash + 1..].trim().parse().ok()?;
    Some((start, end))
}

/// Parse a full row string: `|`-separated rows with RLE tokens, `~N` row
/// repetition, or a 2D shape primitive replacing the whole grid.
fn parse_row_string(row_string: &str) -> Result<Vec<Vec<String>>, SchematicError> {
    if let Some(grid) = generate_2d_shape(row_string)? {
        return Ok(grid);
    }

    let mut grid = Vec::new();
    for raw_row in row_string.split('|') {
        let raw_row = raw_row.trim();
        if raw_row.is_empty() {
            continue;
        }
        grid.extend(parse_raw_row(raw_row)?);
    }
    Ok(grid)
}

/// One raw row, possibly with a trailing `~N` repeat.
fn parse_raw_row(raw_row: &str) -> Result<Vec<Vec<String>>, SchematicError> {
    let raw_row = raw_row.trim();
    if let Some((pattern, count_raw)) = raw_row.rsplit_once('~') {
        let count: usize = count_raw.trim().parse().map_err(|_| {
            SchematicError::InvalidRepeat {
                raw: raw_row.to_owned(),
            }
        })?;
        let expanded = expand_rle_row(pattern.trim())?;
        return Ok(vec![expanded; count]);
    }
    Ok(vec![expand_rle_row(raw_row)?])
}

/// Expand `"S*3 P ."` into `["S", "S", "S", "P", "."]`.
pub fn expand_rle_row(row: &str) -> Result<Vec<String>, SchematicError> {
    let mut symbols = Vec::new();
    for token in row.split_whitespace() {
        if let Some((symbol, count_raw)) = token.split_once('*') {
            let count: usize =
                count_raw.parse().map_err(|_| SchematicError::InvalidRepeat {
                    raw: token.to_owned(),
                })?;
            for _ in 0..count {
                symbols.push(symbol.to_owned());
            }
        } else {
            symbols.push(token.to_owned());
        }
    }
    Ok(symbols)
}

fn shape_2d_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(fill|outline|frame|walls):(\d+)x(\d+):([A-Za-z_][A-Za-z0-9_]*)(?::([A-Za-z_][A-Za-z0-9_]*))?$",
        )
        .expect("static pattern compiles")
    })
}

fn shape_3d_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(box|room):(\d+)x(\d+)x(\d+):([A-Za-z_][A-Za-z0-9_]*)(?::([A-Za-z_][A-Za-z0-9_]*))?$",
        )
        .expect("static pattern compiles")
    })
}

/// 2D shape primitives usable in place of a row string. Returns `None` when
/// the string is not shaped like a primitive at all.
fn generate_2d_shape(raw: &str) -> Result<Option<Vec<Vec<String>>>, SchematicError> {
    let trimmed = raw.trim();
    let looks_like_shape = ["fill:", "outline:", "frame:", "walls:"]
        .iter()
        .any(|prefix| trimmed.starts_with(prefix));
    if !looks_like_shape {
        return Ok(None);
    }
    let captures = shape_2d_pattern()
        .captures(trimmed)
        .ok_or_else(|| SchematicError::InvalidShape {
            raw: trimmed.to_owned(),
        })?;

    let kind = &captures[1];
    let width: usize = captures[2].parse().map_err(|_| SchematicError::InvalidShape {
        raw: trimmed.to_owned(),
    })?;
    let depth: usize = captures[3].parse().map_err(|_| SchematicError::InvalidShape {
        raw: trimmed.to_owned(),
    })?;
    let border = captures[4].to_owned();
    let interior = captures.get(5).map(|m| m.as_str().to_owned());

    if width == 0 || depth == 0 {
        return Err(SchematicError::InvalidShape {
            raw: trimmed.to_owned(),
        });
    }

    let grid = match kind {
        "fill" => vec![vec![border; width]; depth],
        "outline" | "walls" => hollow_rectangle(width, depth, &border, "."),
        "frame" => hollow_rectangle(width, depth, &border, interior.as_deref().unwrap_or(".")),
        _ => return Ok(None),
    };
    Ok(Some(grid))
}

fn hollow_rectangle(
    width: usize,
    depth: usize,
    border: &str,
    interior: &str,
) -> Vec<Vec<String>> {
    let mut grid = Vec::with_capacity(depth);
    for z in 0..depth {
        if z == 0 || z == depth - 1 {
            grid.push(vec![border.to_owned(); width]);
        } else {
            let mut row = vec![interior.to_owned(); width];
            row[0] = border.to_owned();
            row[width - 1] = border.to_owned();
            grid.push(row);
        }
    }
    grid
}

/// 3D primitives: `box:WxHxD:S` (solid floor, hollow walls, solid ceiling)
/// and `room:WxHxD:W:F` (walls `W`, floor `F`).
pub fn generate_3d_shape_layers(raw: &str) -> Result<Vec<Layer>, SchematicError> {
    let trimmed = raw.trim();
    let captures = shape_3d_pattern()
        .captures(trimmed)
        .ok_or_else(|| SchematicError::InvalidShape {
            raw: trimmed.to_owned(),
        })?;

    let width: usize = captures[2].parse().map_err(|_| SchematicError::InvalidShape {
        raw: trimmed.to_owned(),
    })?;
    let height: usize = captures[3].parse().map_err(|_| SchematicError::InvalidShape {
        raw: trimmed.to_owned(),
    })?;
    let depth: usize = captures[4].parse().map_err(|_| SchematicError::InvalidShape {
        raw: trimmed.to_owned(),
    })?;
    let wall = captures[5].to_owned();
    let floor = captures.get(6).map(|m| m.as_str().to_owned()).unwrap_or_else(|| wall.clone());

    if width == 0 || height == 0 || depth == 0 {
        return Err(SchematicError::InvalidShape {
            raw: trimmed.to_owned(),
        });
    }

    let mut layers = Vec::with_capacity(height);
    layers.push(Layer {
        y_offset: 0,
        grid: vec![vec![floor; width]; depth],
    });
    if height > 2 {
        let wall_grid = hollow_rectangle(width, depth, &wall, ".");
        for y in 1..height - 1 {
            layers.push(Layer {
                y_offset: y as i64,
                grid: wall_grid.clone(),
            });
        }
    }
    if height > 1 {
        layers.push(Layer {
            y_offset: (height - 1) as i64,
            grid: vec![vec![wall; width]; depth],
        });
    }
    Ok(layers)
}

// ---- rotation ---------------------------------------------------------------

const COMPASS: [&str; 4] = ["north", "east", "south", "west"];

/// Rotate a grid clockwise by 90° steps. Ragged rows are padded with air.
pub fn rotate_grid(grid: &[Vec<String>], steps: usize) -> Vec<Vec<String>> {
    let steps = steps % 4;
    let mut result: Vec<Vec<String>> = grid.to_vec();
    for _ in 0..steps {
        let rows = result.len();
        let cols = result.iter().map(Vec::len).max().unwrap_or(0);
        let mut rotated = Vec::with_capacity(cols);
        for col in 0..cols {
            let mut new_row = Vec::with_capacity(rows);
            for row in (0..rows).rev() {
                let symbol =
                    result[row].get(col).cloned().unwrap_or_else(|| ".".to_owned());
                new_row.push(symbol);
            }
            rotated.push(new_row);
        }
        result = rotated;
    }
    result
}

fn block_spec_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z0-9_:]+)(\[[^\]]*\])?(\{.*\})?$").expect("static pattern compiles")
    })
}

/// Rotate orientation-bearing block-state attributes by `steps` clockwise
/// quarter turns: `facing` walks the compass, `axis` swaps x/z on odd steps,
/// `rotation` advances by 4 per step (mod 16). `half`, `shape`, and `hinge`
/// are facing-relative and carried unchanged.
pub fn rotate_block_state(block: &str, steps: usize) -> String {
    let steps = steps % 4;
    if steps == 0 {
        return block.to_owned();
    }

    let Some(captures) = block_spec_pattern().captures(block) else {
        return block.to_owned();
    };
    let block_id = &captures[1];
    let Some(states_raw) = captures.get(2).map(|m| m.as_str()) else {
        return block.to_owned();
    };
    let nbt = captures.get(3).map(|m| m.as_str()).unwrap_or("");

    let inner = &states_raw[1..states_raw.len() - 1];
    let mut states: Vec<(String, String)> = Vec::new();
    for part in inner.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            states.push((key.trim().to_owned(), value.trim().to_owned()));
        }
    }

    for (key, value) in &mut states {
        match key.as_str() {
            "facing" => {
                if let Some(index) = COMPASS.iter().position(|dir| dir == value) {
                    *value = COMPASS[(index + steps) % 4].to_owned();
                }
            }
            "axis" if steps % 2 == 1 => {
                if value == "x" {
                    *value = "z".to_owned();
                } else if value == "z" {
                    *value = "x".to_owned();
                }
            }
            "rotation" => {
                if let Ok(rotation) = value.parse::<u32>() {
                    *value = ((rotation + steps as u32 * 4) % 16).to_string();
                }
            }
            _ => {}
        }
    }

    if states.is_empty() {
        return format!("{block_id}{nbt}");
    }
    let rebuilt: Vec<String> =
        states.iter().map(|(key, value)| format!("{key}={value}")).collect();
    format!("{block_id}[{}]{nbt}", rebuilt.join(","))
}

// ---- expansion --------------------------------------------------------------

impl Schematic {
    /// Expand to placement commands against a resolved anchor, in emission
    /// order: layers bottom-up, rows north to south, columns west to east.
    pub fn expand(
        &self,
        anchor: (i64, i64, i64),
    ) -> Result<(Vec<String>, ExpandStats), SchematicError> {
        let (anchor_x, anchor_y, anchor_z) = anchor;
        let steps = self.facing.rotation_steps();

        let mut ordered: Vec<&Layer> = self.layers.iter().collect();
        ordered.sort_by_key(|layer| layer.y_offset);

        let mut commands = Vec::new();
        let mut stats = ExpandStats {
            warnings: self.warnings.clone(),
            ..ExpandStats::default()
        };

        for layer in ordered {
            if layer.grid.is_empty() {
                continue;
            }
            stats.layers += 1;
            let grid = if steps > 0 {
                rotate_grid(&layer.grid, steps)
            } else {
                layer.grid.clone()
            };

            for (z_index, row) in grid.iter().enumerate() {
                for (x_index, symbol) in row.iter().enumerate() {
                    if symbol.is_empty() || AIR_SYMBOLS.contains(&symbol.as_str()) {
                        continue;
                    }
                    let block = self.resolve_symbol(symbol, layer.y_offset)?;
                    if block == "air" {
                        continue;
                    }
                    let block = if steps > 0 {
                        rotate_block_state(&block, steps)
                    } else {
                        block
                    };

                    let world_x = anchor_x + x_index as i64;
                    let world_y = anchor_y + layer.y_offset;
                    let world_z = anchor_z + z_index as i64;
                    let command = match self.mode {
                        PlacementMode::Replace => {
                            format!("/setblock {world_x} {world_y} {world_z} {block}")
                        }
                        mode => format!(
                            "/setblock {world_x} {world_y} {world_z} {block} {}",
                            mode.as_str()
                        ),
                    };
                    commands.push(command);
                    stats.blocks_placed += 1;
                }
            }
        }

        Ok((commands, stats))
    }

    fn resolve_symbol(&self, symbol: &str, y_offset: i64) -> Result<String, SchematicError> {
        if let Some(block) = self.palette.get(symbol) {
            return Ok(block.clone());
        }
        // A symbol that already looks like a block id is used directly.
        let head = symbol.split(['[', '{']).next().unwrap_or(symbol);
        let id_like = !head.is_empty()
            && head
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == ':');
        if id_like {
            return Ok(symbol.to_owned());
        }
        Err(SchematicError::UnknownSymbol {
            symbol: symbol.to_owned(),
            y_offset,
        })
    }
}

#[cfg(test)]
mod tests;
