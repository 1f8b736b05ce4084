// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Region snapshots and the caps mirrored from the game-client helper.
//!
//! A snapshot carries a palette of unique block ids and a run-length-encoded
//! block index sequence. Iteration order is `y` outermost, then `z`, then `x`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caps enforced peer-side and mirrored here so oversized requests fail
/// before they hit the wire.
pub const MAX_REGION_SCAN_BLOCKS: i64 = 64 * 64 * 64;
pub const MAX_HEIGHTMAP_COLUMNS: i64 = 256 * 256;
pub const MAX_ANALYSIS_SAMPLES: i64 = 128 * 128 * 128;
pub const MAX_PALETTE_RADIUS: u32 = 64;
pub const MIN_RESOLUTION: u32 = 1;
pub const MAX_RESOLUTION: u32 = 4;

/// One element of the RLE `blocks` sequence: a bare palette index for a
/// single block, or an `[index, count]` pair for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRun {
    Single(u32),
    Run([u32; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub origin: (i64, i64, i64),
    pub dimensions: (i64, i64, i64),
    pub palette: Vec<String>,
    pub blocks: Vec<BlockRun>,
    #[serde(default)]
    pub stats: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotError {
    IndexOutOfRange { index: u32, palette_len: usize },
    LengthMismatch { decoded: usize, expected: usize },
    Malformed(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, palette_len } => write!(
                f,
                "palette index {index} out of range for palette of {palette_len}"
            ),
            Self::LengthMismatch { decoded, expected } => write!(
                f,
                "decoded {decoded} blocks but dimensions require {expected}"
            ),
            Self::Malformed(detail) => write!(f, "malformed region snapshot: {detail}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl RegionSnapshot {
    /// Decode the helper's result payload. Field shapes are tolerant:
    /// `origin`/`dimensions` may arrive as arrays or as an object with
    /// separate keys.
    pub fn from_result(result: &Value) -> Result<Self, SnapshotError> {
        let object = result
            .as_object()
            .ok_or_else(|| SnapshotError::Malformed("result is not an object".to_owned()))?;

        let origin = read_triple(object.get("origin"))
            .ok_or_else(|| SnapshotError::Malformed("missing origin triple".to_owned()))?;
        let dimensions = read_triple(object.get("dimensions"))
            .ok_or_else(|| SnapshotError::Malformed("missing dimensions triple".to_owned()))?;

        let palette = object
            .get("palette")
            .and_then(Value::as_array)
            .ok_or_else(|| SnapshotError::Malformed("missing palette list".to_owned()))?
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| SnapshotError::Malformed("palette entry is not a string".to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let blocks = object
            .get("blocks")
            .and_then(Value::as_array)
            .ok_or_else(|| SnapshotError::Malformed("missing blocks sequence".to_owned()))?
            .iter()
            .map(|entry| {
                serde_json::from_value(entry.clone())
                    .map_err(|err| SnapshotError::Malformed(format!("bad block run: {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin,
            dimensions,
            palette,
            blocks,
            stats: object.get("stats").cloned(),
        })
    }

    pub fn block_count(&self) -> usize {
        let (dx, dy, dz) = self.dimensions;
        (dx.max(0) * dy.max(0) * dz.max(0)) as usize
    }

    /// Expand the RLE sequence into one block id per cell, y outermost, then
    /// z, then x. Validates palette indices and the total length.
    pub fn expand_blocks(&self) -> Result<Vec<&str>, SnapshotError> {
        let expected = self.block_count();
        let mut expanded = Vec::with_capacity(expected);

        for run in &self.blocks {
            let (index, count) = match run {
                BlockRun::Single(index) => (*index, 1usize),
                BlockRun::Run([index, count]) => (*index, *count as usize),
            };
            let block = self
                .palette
                .get(index as usize)
                .ok_or(SnapshotError::IndexOutOfRange {
                    index,
                    palette_len: self.palette.len(),
                })?;
            for _ in 0..count {
                expanded.push(block.as_str());
            }
        }

        if expanded.len() != expected {
            return Err(SnapshotError::LengthMismatch {
                decoded: expanded.len(),
                expected,
            });
        }
        Ok(expanded)
    }

    /// Block id at region-local coordinates, following snapshot iteration
    /// order.
    pub fn block_at(&self, x: i64, y: i64, z: i64) -> Result<Option<&str>, SnapshotError> {
        let (dx, _dy, dz) = self.dimensions;
        let index = (y * dz + z) * dx + x;
        let expanded = self.expand_blocks()?;
        Ok(expanded.get(index as usize).copied())
    }
}

fn read_triple(value: Option<&Value>) -> Option<(i64, i64, i64)> {
    let value = value?;
    if let Some(items) = value.as_array() {
        if items.len() == 3 {
            return Some((items[0].as_i64()?, items[1].as_i64()?, items[2].as_i64()?));
        }
        return None;
    }
    let object = value.as_object()?;
    Some((
        object.get("x")?.as_i64()?,
        object.get("y")?.as_i64()?,
        object.get("z")?.as_i64()?,
    ))
}

/// Volume of an inclusive integer box.
pub fn box_volume(bounds: (i64, i64, i64, i64, i64, i64)) -> i64 {
    let (x1, y1, z1, x2, y2, z2) = bounds;
    ((x2 - x1).abs() + 1) * ((y2 - y1).abs() + 1) * ((z2 - z1).abs() + 1)
}

/// Columns of an inclusive 2D area.
pub fn area_columns(x1: i64, z1: i64, x2: i64, z2: i64) -> i64 {
    ((x2 - x1).abs() + 1) * ((z2 - z1).abs() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_value() -> Value {
        json!({
            "origin": [10, 64, -5],
            "dimensions": [2, 2, 1],
            "palette": ["air", "stone"],
            "blocks": [[0, 2], 1, 0],
            "stats": { "total_blocks": 4, "unique_types": 2 },
        })
    }

    #[test]
    fn decodes_and_round_trips_rle() {
        let snapshot = RegionSnapshot::from_result(&snapshot_value()).expect("decode");
        assert_eq!(snapshot.origin, (10, 64, -5));
        assert_eq!(snapshot.block_count(), 4);

        let expanded = snapshot.expand_blocks().expect("expand");
        assert_eq!(expanded, vec!["air", "air", "stone", "air"]);
    }

    #[test]
    fn iteration_order_is_y_then_z_then_x() {
        // 2 wide (x), 1 tall (y), 2 deep (z): cells in order are
        // (x0,z0), (x1,z0), (x0,z1), (x1,z1).
        let snapshot = RegionSnapshot::from_result(&json!({
            "origin": [0, 0, 0],
            "dimensions": [2, 1, 2],
            "palette": ["a", "b", "c", "d"],
            "blocks": [0, 1, 2, 3],
        }))
        .expect("decode");

        assert_eq!(snapshot.block_at(0, 0, 0).expect("decode"), Some("a"));
        assert_eq!(snapshot.block_at(1, 0, 0).expect("decode"), Some("b"));
        assert_eq!(snapshot.block_at(0, 0, 1).expect("decode"), Some("c"));
        assert_eq!(snapshot.block_at(1, 0, 1).expect("decode"), Some("d"));
    }

    #[test]
    fn rejects_out_of_range_palette_index() {
        let snapshot = RegionSnapshot::from_result(&json!({
            "origin": [0, 0, 0],
            "dimensions": [1, 1, 1],
            "palette": ["air"],
            "blocks": [7],
        }))
        .expect("decode");
        let err = snapshot.expand_blocks().unwrap_err();
        assert!(matches!(err, SnapshotError::IndexOutOfRange { index: 7, .. }));
    }

    #[test]
    fn rejects_length_mismatch() {
        let snapshot = RegionSnapshot::from_result(&json!({
            "origin": [0, 0, 0],
            "dimensions": [2, 1, 1],
            "palette": ["air"],
            "blocks": [0],
        }))
        .expect("decode");
        let err = snapshot.expand_blocks().unwrap_err();
        assert_eq!(
            err,
            SnapshotError::LengthMismatch {
                decoded: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn accepts_object_shaped_triples() {
        let snapshot = RegionSnapshot::from_result(&json!({
            "origin": { "x": 1, "y": 2, "z": 3 },
            "dimensions": { "x": 1, "y": 1, "z": 1 },
            "palette": ["stone"],
            "blocks": [0],
        }))
        .expect("decode");
        assert_eq!(snapshot.origin, (1, 2, 3));
    }

    #[test]
    fn volume_helpers() {
        assert_eq!(box_volume((0, 0, 0, 63, 63, 63)), MAX_REGION_SCAN_BLOCKS);
        assert_eq!(box_volume((10, 10, 10, 10, 10, 10)), 1);
        assert_eq!(area_columns(0, 0, 255, 255), MAX_HEIGHTMAP_COLUMNS);
        assert_eq!(area_columns(5, 5, 0, 0), 36);
    }
}
