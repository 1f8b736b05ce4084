// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::*;
use serde_json::json;

fn parse(value: serde_json::Value) -> Schematic {
    parse_schematic(&value).expect("schematic parses")
}

#[test]
fn ring_expansion_skips_the_air_center() {
    let schematic = parse(json!({
        "a": [100, 64, 200],
        "p": { "S": "stone_bricks", ".": "air" },
        "l": [[0, "S*3|S . S|S*3"]],
    }));
    let (commands, stats) = schematic.expand((100, 64, 200)).expect("expand");

    assert_eq!(stats.blocks_placed, 8);
    assert_eq!(stats.layers, 1);
    assert_eq!(
        commands,
        vec![
            "/setblock 100 64 200 stone_bricks",
            "/setblock 101 64 200 stone_bricks",
            "/setblock 102 64 200 stone_bricks",
            "/setblock 100 64 201 stone_bricks",
            "/setblock 102 64 201 stone_bricks",
            "/setblock 100 64 202 stone_bricks",
            "/setblock 101 64 202 stone_bricks",
            "/setblock 102 64 202 stone_bricks",
        ]
    );
}

#[test]
fn expansion_is_deterministic() {
    let value = json!({
        "a": "player",
        "p": { "S": "stone", "G": "glass" },
        "l": [[0, "S G|G S"], ["1-2", "S*2|S*2"]],
        "f": "east",
    });
    let schematic = parse(value.clone());
    let (first, _) = schematic.expand((10, 70, -5)).expect("expand");
    let (second, _) = parse(value).expand((10, 70, -5)).expect("expand");
    assert_eq!(first, second);
}

#[test]
fn short_and_long_keys_are_equivalent() {
    let compact = parse(json!({
        "a": [0, 64, 0],
        "p": { "S": "stone" },
        "l": [[0, "S*2"]],
        "f": "south",
        "m": "keep",
    }));
    let verbose = parse(json!({
        "anchor": [0, 64, 0],
        "palette": { "S": "stone" },
        "layers": [[0, "S*2"]],
        "facing": "south",
        "mode": "keep",
    }));
    assert_eq!(compact, verbose);
}

#[test]
fn verbose_grid_layers_parse() {
    let schematic = parse(json!({
        "anchor": [0, 0, 0],
        "palette": { "S": "stone" },
        "layers": [{ "y": 2, "grid": [["S", "."], [".", "S"]] }],
    }));
    let (commands, _) = schematic.expand((0, 0, 0)).expect("expand");
    assert_eq!(commands, vec!["/setblock 0 2 0 stone", "/setblock 1 2 1 stone"]);
}

#[test]
fn rows_form_with_row_repeat() {
    let schematic = parse(json!({
        "p": { "S": "stone" },
        "l": [{ "y": 0, "rows": ["S*2~2", "S ."] }],
    }));
    let (commands, stats) = schematic.expand((0, 64, 0)).expect("expand");
    assert_eq!(stats.blocks_placed, 5);
    // Two repeated full rows, then one row with a single block.
    assert_eq!(commands[4], "/setblock 0 64 2 stone");
}

#[test]
fn layer_ranges_expand_inclusively() {
    let schematic = parse(json!({
        "p": { "S": "stone" },
        "l": [["1-3", "S"]],
    }));
    let (commands, stats) = schematic.expand((0, 0, 0)).expect("expand");
    assert_eq!(stats.layers, 3);
    assert_eq!(
        commands,
        vec!["/setblock 0 1 0 stone", "/setblock 0 2 0 stone", "/setblock 0 3 0 stone"]
    );
}

#[test]
fn modes_append_to_setblock() {
    let schematic = parse(json!({
        "p": { "S": "stone" },
        "l": [[0, "S"]],
        "m": "keep",
    }));
    let (commands, _) = schematic.expand((0, 64, 0)).expect("expand");
    assert_eq!(commands, vec!["/setblock 0 64 0 stone keep"]);
}

#[test]
fn two_dimensional_shapes_expand() {
    let fill = parse(json!({ "p": { "S": "stone" }, "l": [[0, "fill:3x2:S"]] }));
    let (commands, _) = fill.expand((0, 0, 0)).expect("expand");
    assert_eq!(commands.len(), 6);

    let outline = parse(json!({ "p": { "B": "bricks" }, "l": [[0, "outline:4x3:B"]] }));
    let (commands, _) = outline.expand((0, 0, 0)).expect("expand");
    // 4x3 border: full top and bottom rows plus two side cells.
    assert_eq!(commands.len(), 4 + 4 + 2);

    let frame = parse(json!({ "p": { "B": "bricks", "G": "glass" }, "l": [[0, "frame:3x3:B:G"]] }));
    let (commands, _) = frame.expand((0, 0, 0)).expect("expand");
    assert_eq!(commands.len(), 9);
    assert_eq!(commands[4], "/setblock 1 0 1 glass");
}

#[test]
fn box_shape_generates_floor_walls_ceiling() {
    let schematic = parse(json!({
        "a": [0, 64, 0],
        "p": { "S": "stone" },
        "s": "box:3x3x3:S",
    }));
    assert_eq!(schematic.layers.len(), 3);
    let (commands, stats) = schematic.expand((0, 64, 0)).expect("expand");
    // Solid 3x3 floor and ceiling, hollow middle ring of 8.
    assert_eq!(stats.blocks_placed, 9 + 8 + 9);
    assert!(commands.iter().all(|command| command.starts_with("/setblock ")));
}

#[test]
fn room_shape_uses_floor_material() {
    let schematic = parse(json!({
        "p": { "W": "bricks", "F": "oak_planks" },
        "s": "room:3x2x3:W:F",
    }));
    let (commands, _) = schematic.expand((0, 0, 0)).expect("expand");
    assert!(commands[0].ends_with("oak_planks"));
    assert!(commands.last().is_some_and(|command| command.ends_with("bricks")));
}

#[test]
fn facing_east_rotates_grid_clockwise() {
    // A 1x2 row pointing east becomes a 2x1 column.
    let schematic = parse(json!({
        "p": { "S": "stone", "G": "glass" },
        "l": [[0, "S G"]],
        "f": "east",
    }));
    let (commands, _) = schematic.expand((0, 64, 0)).expect("expand");
    assert_eq!(commands, vec!["/setblock 0 64 0 stone", "/setblock 0 64 1 glass"]);
}

#[test]
fn facing_rotates_block_state_attributes() {
    let schematic = parse(json!({
        "p": { "D": "oak_door[facing=north,half=lower,hinge=left]" },
        "l": [[0, "D"]],
        "f": "east",
    }));
    let (commands, _) = schematic.expand((0, 64, 0)).expect("expand");
    assert_eq!(
        commands,
        vec!["/setblock 0 64 0 oak_door[facing=east,half=lower,hinge=left]"]
    );
}

#[test]
fn rotation_four_times_east_is_identity() {
    let grid = vec![
        vec!["S".to_owned(), "G".to_owned(), ".".to_owned()],
        vec![".".to_owned(), "S".to_owned(), "G".to_owned()],
    ];
    let mut rotated = grid.clone();
    for _ in 0..4 {
        rotated = rotate_grid(&rotated, 1);
    }
    assert_eq!(rotated, grid);

    let block = "oak_stairs[facing=west,half=top,shape=inner_left]";
    let mut spun = block.to_owned();
    for _ in 0..4 {
        spun = rotate_block_state(&spun, 1);
    }
    assert_eq!(spun, block);

    // North is the identity rotation.
    assert_eq!(rotate_grid(&grid, 0), grid);
    assert_eq!(rotate_block_state(block, 0), block);
}

#[test]
fn axis_and_sign_rotation_attributes() {
    assert_eq!(rotate_block_state("oak_log[axis=x]", 1), "oak_log[axis=z]");
    assert_eq!(rotate_block_state("oak_log[axis=z]", 1), "oak_log[axis=x]");
    assert_eq!(rotate_block_state("oak_log[axis=y]", 1), "oak_log[axis=y]");
    assert_eq!(rotate_block_state("oak_log[axis=x]", 2), "oak_log[axis=x]");
    assert_eq!(
        rotate_block_state("oak_sign[rotation=14]", 1),
        "oak_sign[rotation=2]"
    );
}

#[test]
fn nbt_suffix_survives_rotation() {
    assert_eq!(
        rotate_block_state("chest[facing=north]{Items:[]}", 2),
        "chest[facing=south]{Items:[]}"
    );
}

#[test]
fn symbols_that_look_like_block_ids_pass_through() {
    let schematic = parse(json!({
        "p": {},
        "l": [[0, "oak_planks"]],
    }));
    let (commands, _) = schematic.expand((0, 0, 0)).expect("expand");
    assert_eq!(commands, vec!["/setblock 0 0 0 oak_planks"]);
}

#[test]
fn unknown_symbols_are_errors() {
    let schematic = parse(json!({
        "p": { "S": "stone" },
        "l": [[0, "S ?"]],
    }));
    let err = schematic.expand((0, 0, 0)).unwrap_err();
    assert!(matches!(err, SchematicError::UnknownSymbol { y_offset: 0, .. }));
}

#[test]
fn layers_emit_bottom_up_regardless_of_input_order() {
    let schematic = parse(json!({
        "p": { "S": "stone" },
        "l": [[5, "S"], [1, "S"], [3, "S"]],
    }));
    let (commands, _) = schematic.expand((0, 0, 0)).expect("expand");
    assert_eq!(
        commands,
        vec!["/setblock 0 1 0 stone", "/setblock 0 3 0 stone", "/setblock 0 5 0 stone"]
    );
}

#[test]
fn player_anchor_and_fixed_anchor_parse() {
    let schematic = parse(json!({ "a": "player", "p": { "S": "stone" }, "l": [[0, "S"]] }));
    assert_eq!(schematic.anchor, Anchor::Player);

    let schematic = parse(json!({ "a": [1, 2, 3], "p": { "S": "stone" }, "l": [[0, "S"]] }));
    assert_eq!(schematic.anchor, Anchor::Fixed(1, 2, 3));
}

#[test]
fn malformed_inputs_are_rejected() {
    assert!(matches!(
        parse_schematic(&json!([])),
        Err(SchematicError::NotAnObject)
    ));
    assert!(matches!(
        parse_schematic(&json!({ "a": [1, 2], "l": [[0, "S"]] })),
        Err(SchematicError::InvalidAnchor { .. })
    ));
    assert!(matches!(
        parse_schematic(&json!({ "p": {} })),
        Err(SchematicError::NoLayers)
    ));
    assert!(matches!(
        parse_schematic(&json!({ "l": [[0, "S"]], "s": "box:0x3x3:S", "p": {} }))
            .map(|schematic| schematic.layers.len()),
        Ok(1)
    ));
    assert!(matches!(
        parse_schematic(&json!({ "s": "box:0x3x3:S", "p": {} })),
        Err(SchematicError::InvalidShape { .. })
    ));
    assert!(matches!(
        parse_schematic(&json!({ "l": [["3-1", "S"]], "p": {} })),
        Err(SchematicError::InvalidRange { .. })
    ));
}

#[test]
fn unknown_facing_and_mode_fall_back_with_warnings() {
    let schematic = parse(json!({
        "p": { "S": "stone" },
        "l": [[0, "S"]],
        "f": "upward",
        "m": "merge",
    }));
    assert_eq!(schematic.facing, Facing::North);
    assert_eq!(schematic.mode, PlacementMode::Replace);
    assert_eq!(schematic.warnings.len(), 2);
    let (_, stats) = schematic.expand((0, 0, 0)).expect("expand");
    assert_eq!(stats.warnings.len(), 2);
}
