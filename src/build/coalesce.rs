// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Strict block-preserving rewrite of adjacent `/setblock` commands into
//! `/fill` boxes. Greedy: from each unused position, extend along x, then z,
//! then y while the full face keeps matching. Commands that are not plain
//! setblocks pass through unchanged; when in doubt, nothing is merged.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn setblock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/setblock\s+(-?\d+)\s+(-?\d+)\s+(-?\d+)\s+(\S+)$")
            .expect("static pattern compiles")
    })
}

pub fn coalesce_commands(commands: Vec<String>) -> Vec<String> {
    if commands.len() < 2 {
        return commands;
    }

    let mut passthrough = Vec::new();
    // Block type -> positions, in first-seen order for determinism.
    let mut groups: Vec<(String, Vec<(i64, i64, i64)>)> = Vec::new();

    for command in &commands {
        match setblock_pattern().captures(command) {
            Some(captures) => {
                let parsed = (
                    captures[1].parse::<i64>(),
                    captures[2].parse::<i64>(),
                    captures[3].parse::<i64>(),
                );
                let (Ok(x), Ok(y), Ok(z)) = parsed else {
                    passthrough.push(command.clone());
                    continue;
                };
                let block = captures[4].to_owned();
                match groups.iter_mut().find(|(existing, _)| *existing == block) {
                    Some((_, positions)) => positions.push((x, y, z)),
                    None => groups.push((block, vec![(x, y, z)])),
                }
            }
            None => passthrough.push(command.clone()),
        }
    }

    if groups.is_empty() {
        return commands;
    }

    let mut merged = passthrough;
    for (block, mut positions) in groups {
        positions.sort_by_key(|&(x, y, z)| (y, z, x));
        positions.dedup();
        let lookup: HashSet<(i64, i64, i64)> = positions.iter().copied().collect();
        let mut used: HashSet<(i64, i64, i64)> = HashSet::new();

        for &(x1, y1, z1) in &positions {
            if used.contains(&(x1, y1, z1)) {
                continue;
            }

            let mut x2 = x1;
            while lookup.contains(&(x2 + 1, y1, z1)) && !used.contains(&(x2 + 1, y1, z1)) {
                x2 += 1;
            }

            let mut z2 = z1;
            'extend_z: loop {
                for x in x1..=x2 {
                    let candidate = (x, y1, z2 + 1);
                    if !lookup.contains(&candidate) || used.contains(&candidate) {
                        break 'extend_z;
                    }
                }
                z2 += 1;
            }

            let mut y2 = y1;
            'extend_y: loop {
                for z in z1..=z2 {
                    for x in x1..=x2 {
                        let candidate = (x, y2 + 1, z);
                        if !lookup.contains(&candidate) || used.contains(&candidate) {
                            break 'extend_y;
                        }
                    }
                }
                y2 += 1;
            }

            for y in y1..=y2 {
                for z in z1..=z2 {
                    for x in x1..=x2 {
                        used.insert((x, y, z));
                    }
                }
            }

            let volume = (x2 - x1 + 1) * (y2 - y1 + 1) * (z2 - z1 + 1);
            if volume == 1 {
                merged.push(format!("/setblock {x1} {y1} {z1} {block}"));
            } else {
                merged.push(format!("/fill {x1} {y1} {z1} {x2} {y2} {z2} {block}"));
            }
        }
    }

    merged
}
