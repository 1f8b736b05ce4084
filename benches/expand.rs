// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

use vibecraft::build::coalesce_commands;
use vibecraft::sandbox::run_build_script;
use vibecraft::schematic::parse_schematic;

// Benchmark identity (keep stable):
// - Group names in this file: `schematic.expand`, `sandbox.run`, `build.coalesce`
// - Case IDs must remain stable across refactors so results stay comparable.
fn benches_expand(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("schematic.expand");

        let cases = [
            (
                "ring_3x3",
                json!({
                    "a": [0, 64, 0],
                    "p": { "S": "stone_bricks" },
                    "l": [[0, "S*3|S . S|S*3"]],
                }),
            ),
            (
                "tower_box",
                json!({
                    "a": [0, 64, 0],
                    "p": { "S": "stone_bricks" },
                    "s": "box:9x12x9:S",
                }),
            ),
            (
                "rotated_walls",
                json!({
                    "a": [0, 64, 0],
                    "p": { "W": "oak_planks" },
                    "l": [["0-7", "walls:16x16:W"]],
                    "f": "east",
                }),
            ),
        ];

        for (case_id, value) in cases {
            let schematic = parse_schematic(&value).expect("parse_schematic");
            let (commands, _) = schematic.expand((0, 64, 0)).expect("expand");
            group.throughput(Throughput::Elements(commands.len() as u64));
            group.bench_function(case_id, |b| {
                b.iter(|| {
                    let (commands, stats) =
                        black_box(&schematic).expand(black_box((0, 64, 0))).expect("expand");
                    black_box((commands.len(), stats.blocks_placed))
                })
            });
        }

        group.finish();
    }

    {
        let mut group = c.benchmark_group("sandbox.run");

        let sphere = "commands = []\n\
                      for x in range(0, 20):\n\
                      \x20   for y in range(0, 20):\n\
                      \x20       for z in range(0, 20):\n\
                      \x20           if sqrt((x-10)**2 + (y-10)**2 + (z-10)**2) < 9:\n\
                      \x20               commands.append(f\"/setblock {x} {y} {z} stone\")\n";
        group.bench_function("sphere_20", |b| {
            b.iter(|| black_box(run_build_script(black_box(sphere)).expect("run")).len())
        });

        group.finish();
    }

    {
        let mut group = c.benchmark_group("build.coalesce");

        let mut commands = Vec::new();
        for y in 0..4 {
            for z in 0..16 {
                for x in 0..16 {
                    commands.push(format!("/setblock {x} {y} {z} stone"));
                }
            }
        }
        group.throughput(Throughput::Elements(commands.len() as u64));
        group.bench_function("slab_16x16x4", |b| {
            b.iter(|| black_box(coalesce_commands(black_box(commands.clone()))).len())
        });

        group.finish();
    }
}

criterion_group!(benches, benches_expand);
criterion_main!(benches);
