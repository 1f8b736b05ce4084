// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::*;
use crate::bridge::testutil::{logged_commands, spawn_scripted_helper, test_config};
use serde_json::json;

async fn engine_with_helper() -> (BuildEngine, crate::bridge::testutil::CommandLog) {
    let (port, log, _handle) = spawn_scripted_helper(true).await;
    let config = test_config(port);
    let bridge = Bridge::new(&config);
    bridge.start().await.expect("bridge start");
    (BuildEngine::new(bridge, &config), log)
}

#[tokio::test]
async fn single_placement_dispatches_one_command() {
    let (engine, log) = engine_with_helper().await;
    let request = BuildRequest::new(
        BuildSource::Commands(vec!["/setblock 100 64 200 stone".to_owned()]),
        "single placement",
    );

    let report = engine.build(request, |_| {}).await.expect("build");
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(logged_commands(&log), vec!["/setblock 100 64 200 stone"]);
    assert!(matches!(report.commands[0].1, CommandOutcome::Ok(_)));
}

#[tokio::test]
async fn preview_never_touches_the_bridge() {
    let (engine, log) = engine_with_helper().await;
    let mut request = BuildRequest::new(
        BuildSource::Commands(vec!["/setblock 100 64 200 stone".to_owned()]),
        "preview",
    );
    request.preview_only = true;

    let report = engine.build(request, |_| {}).await.expect("build");
    assert!(report.preview);
    assert_eq!(report.attempted, 0);
    assert_eq!(report.commands[0].1, CommandOutcome::SkippedPreview);
    assert_eq!(report.commands[0].1.label(), "skipped: preview");
    assert!(logged_commands(&log).is_empty());
}

#[tokio::test]
async fn sanitizer_rejection_aborts_before_any_dispatch() {
    let (engine, log) = engine_with_helper().await;
    let request = BuildRequest::new(
        BuildSource::Commands(vec![
            "/setblock 0 64 0 stone".to_owned(),
            "//regen".to_owned(),
        ]),
        "dangerous",
    );

    let err = engine.build(request, |_| {}).await.unwrap_err();
    let BuildError::Sanitization { command, rejection } = &err else {
        panic!("expected sanitization error, got {err:?}");
    };
    assert_eq!(command, "//regen");
    assert_eq!(rejection.rule(), "dangerous operation");
    // Atomic: the valid first command was not dispatched either.
    assert!(logged_commands(&log).is_empty());
}

#[tokio::test]
async fn worldedit_off_rejects_the_whole_build() {
    let (port, log, _handle) = spawn_scripted_helper(true).await;
    let mut config = test_config(port);
    config.worldedit_mode = WorldEditMode::Off;
    let bridge = Bridge::new(&config);
    bridge.start().await.expect("bridge start");
    let engine = BuildEngine::new(bridge, &config);

    let request = BuildRequest::new(
        BuildSource::Commands(vec!["//set stone".to_owned()]),
        "large region",
    );
    let err = engine.build(request, |_| {}).await.unwrap_err();
    assert!(matches!(err, BuildError::WorldEditUnavailable { .. }));
    assert!(logged_commands(&log).is_empty());
}

#[tokio::test]
async fn worldedit_auto_without_capability_rejects() {
    let (port, _log, _handle) = spawn_scripted_helper(false).await;
    let config = test_config(port);
    let bridge = Bridge::new(&config);
    bridge.start().await.expect("bridge start");
    let engine = BuildEngine::new(bridge, &config);

    let request =
        BuildRequest::new(BuildSource::Commands(vec!["//set stone".to_owned()]), "auto");
    let err = engine.build(request, |_| {}).await.unwrap_err();
    assert!(matches!(
        err,
        BuildError::WorldEditUnavailable {
            mode: WorldEditMode::Auto,
            ..
        }
    ));
}

#[tokio::test]
async fn best_effort_continues_past_failures() {
    let (engine, log) = engine_with_helper().await;
    let mut request = BuildRequest::new(
        BuildSource::Commands(vec![
            "/say one".to_owned(),
            "/fail_me now".to_owned(),
            "/say three".to_owned(),
        ]),
        "best effort",
    );
    request.optimize = false;

    let report = engine.build(request, |_| {}).await.expect("build");
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(logged_commands(&log).len(), 3);
    assert!(matches!(report.commands[1].1, CommandOutcome::Failed(_)));
}

#[tokio::test]
async fn fail_fast_skips_the_remainder() {
    let (engine, log) = engine_with_helper().await;
    let mut request = BuildRequest::new(
        BuildSource::Commands(vec![
            "/fail_me now".to_owned(),
            "/say never".to_owned(),
        ]),
        "fail fast",
    );
    request.fail_fast = true;
    request.optimize = false;

    let report = engine.build(request, |_| {}).await.expect("build");
    assert_eq!(report.attempted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.commands[1].1, CommandOutcome::SkippedAfterFailure);
    assert_eq!(logged_commands(&log), vec!["/fail_me now"]);
}

#[tokio::test]
async fn progress_sink_sees_cumulative_counts() {
    let (engine, _log) = engine_with_helper().await;
    let mut request = BuildRequest::new(
        BuildSource::Commands(vec!["/say one".to_owned(), "/say two".to_owned()]),
        "progress",
    );
    request.optimize = false;

    let mut seen = Vec::new();
    let report = engine
        .build(request, |progress| {
            seen.push((progress.attempted, progress.succeeded, progress.total));
        })
        .await
        .expect("build");
    assert_eq!(report.succeeded, 2);
    assert_eq!(seen, vec![(1, 1, 2), (2, 2, 2)]);
}

#[tokio::test]
async fn script_source_runs_through_the_sandbox() {
    let (engine, log) = engine_with_helper().await;
    let request = BuildRequest::new(
        BuildSource::Script(
            "commands = []\n\
             for x in range(3):\n\
             \x20   commands.append(f\"/setblock {100 + x} 64 200 stone\")\n"
                .to_owned(),
        ),
        "scripted",
    );

    let report = engine.build(request, |_| {}).await.expect("build");
    assert_eq!(report.succeeded, 1, "adjacent placements coalesce into one fill");
    assert_eq!(logged_commands(&log), vec!["/fill 100 64 200 102 64 200 stone"]);
}

#[tokio::test]
async fn script_violations_reject_the_build() {
    let (engine, log) = engine_with_helper().await;
    let request = BuildRequest::new(
        BuildSource::Script("import os\n".to_owned()),
        "bad script",
    );
    let err = engine.build(request, |_| {}).await.unwrap_err();
    assert_eq!(err.kind(), "sandbox_violation");
    assert!(logged_commands(&log).is_empty());
}

#[tokio::test]
async fn schematic_source_expands_and_dispatches() {
    let (engine, log) = engine_with_helper().await;
    let mut request = BuildRequest::new(
        BuildSource::Schematic(json!({
            "a": [10, 64, 10],
            "p": { "S": "stone_bricks" },
            "l": [[0, "S*2"]],
        })),
        "schematic",
    );
    request.optimize = false;

    let report = engine.build(request, |_| {}).await.expect("build");
    assert_eq!(report.succeeded, 2);
    assert_eq!(
        logged_commands(&log),
        vec!["/setblock 10 64 10 stone_bricks", "/setblock 11 64 10 stone_bricks"]
    );
}

#[tokio::test]
async fn player_anchor_resolves_through_the_bridge() {
    let (engine, log) = engine_with_helper().await;
    let mut request = BuildRequest::new(
        BuildSource::Schematic(json!({
            "a": "player",
            "p": { "S": "stone" },
            "l": [[0, "S"]],
        })),
        "player anchor",
    );
    request.optimize = false;

    let report = engine.build(request, |_| {}).await.expect("build");
    assert_eq!(report.succeeded, 1);
    // The scripted helper reports block position (100, 64, 200).
    assert_eq!(logged_commands(&log), vec!["/setblock 100 64 200 stone"]);
}

#[tokio::test]
async fn malformed_schematic_rejects_the_build() {
    let (engine, _log) = engine_with_helper().await;
    let request = BuildRequest::new(
        BuildSource::Schematic(json!({ "p": {} })),
        "no layers",
    );
    let err = engine.build(request, |_| {}).await.unwrap_err();
    assert_eq!(err.kind(), "schematic_malformed");
}

#[tokio::test]
async fn empty_build_is_an_error() {
    let (engine, _log) = engine_with_helper().await;
    let request = BuildRequest::new(BuildSource::Commands(Vec::new()), "empty");
    let err = engine.build(request, |_| {}).await.unwrap_err();
    assert_eq!(err, BuildError::EmptyBuild);
}

#[tokio::test]
async fn bare_commands_are_normalized_before_dispatch() {
    let (engine, log) = engine_with_helper().await;
    let mut request =
        BuildRequest::new(BuildSource::Commands(vec!["say hello".to_owned()]), "bare");
    request.optimize = false;

    engine.build(request, |_| {}).await.expect("build");
    assert_eq!(logged_commands(&log), vec!["/say hello"]);
}

#[test]
fn report_summary_reads_naturally() {
    let report = BuildReport {
        description: "tower".to_owned(),
        commands: Vec::new(),
        attempted: 5,
        succeeded: 4,
        failed: 1,
        preview: false,
        warnings: Vec::new(),
    };
    assert_eq!(report.summary(), "built \"tower\": 4/5 ok, 1 failed");
}
