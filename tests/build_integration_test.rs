//! End-to-end catalogue builds against fake collaborators

mod common;

use common::{ConcatMergeTool, FailingMergeTool, Workspace};
use ntuple_catalogue::core::catalogue::CatalogueBuilder;
use ntuple_catalogue::domain::{CatalogueError, SampleType};
use serde_json::{json, Value};
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn builder(ws: &Workspace, run_db_rows: &[(i64, i64, i64)]) -> (CatalogueBuilder, Arc<ConcatMergeTool>) {
    let config = ws.config(ws.write_run_db(run_db_rows));
    let tool = Arc::new(ConcatMergeTool::default());
    let collaborators = ws.collaborators(&config, tool.clone());
    (CatalogueBuilder::with_collaborators(config, collaborators), tool)
}

fn read_catalogue(ws: &Workspace) -> Value {
    serde_json::from_str(&fs::read_to_string(ws.catalogue_path()).unwrap()).unwrap()
}

#[tokio::test]
async fn test_template_recipe_aborts_before_any_write() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 1.0\n")]);
    let recipe = ws.write_recipe(
        "template",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu"}
        ]}}}),
    );
    let (builder, tool) = builder(&ws, &[]);

    let err = builder.build(&recipe).await.unwrap_err();

    assert!(matches!(err, CatalogueError::Recipe(_)));
    assert!(!ws.catalogue_path().exists());
    assert!(!ws.ntuple_dir().exists());
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_active_and_inactive_samples_in_one_run() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 1.0e19\n"), ("job2.root", "pot 2.5e19\n")])
        .stage("reco_dirt", &[("job1.root", "pot 4.0e19\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu", "sample_type": "mc"},
            {"sample_key": "dirt", "stage_name": "reco_dirt", "active": false}
        ]}}}),
    );
    let (builder, tool) = builder(&ws, &[]);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    assert_eq!(catalogue.entry_count(), 1);
    assert_eq!(summary.entries_annotated, 1);
    assert_eq!(summary.entries_skipped, 1);
    assert!(summary.is_successful());
    assert_eq!(summary.catalogue_path, Some(ws.catalogue_path()));
    assert_eq!(tool.calls.load(Ordering::SeqCst), 1);

    let entry = &catalogue.samples.beamlines["numi_fhc"]["run1"].samples[0];
    assert_eq!(entry.sample_key.as_str(), "nu");
    assert_eq!(entry.sample_type, SampleType::Mc);
    assert_eq!(entry.relative_path, "nu.root");
    assert!((entry.pot - 3.5e19).abs() < 1e6);
    assert_eq!(entry.triggers, None);

    assert!(ws.ntuple_dir().join("nu.root").exists());
    assert!(!ws.ntuple_dir().join("dirt.root").exists());

    let written = read_catalogue(&ws);
    let samples = written["samples"]["beamlines"]["numi_fhc"]["run1"]["samples"]
        .as_array()
        .unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0]["sample_key"], "nu");
    assert_eq!(written["samples"]["ntupledir"], json!(ws.ntuple_dir()));
}

#[tokio::test]
async fn test_repeated_builds_write_identical_catalogues() {
    let mut ws = Workspace::new();
    ws.stage(
        "reco_nu",
        &[("a.root", "pot 0.1\n"), ("b.root", "pot 0.2\n"), ("c.root", "pot 0.3\n")],
    )
    .stage("reco_ext", &[("a.root", "pair 1 1\npair 1 2\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({
            "numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
                {"sample_key": "nu", "stage_name": "reco_nu", "comment": "overlay"}
            ]}},
            "numi_ext": {"run1": {"ext_triggers": 5000, "samples": [
                {"sample_key": "ext", "stage_name": "reco_ext", "sample_type": "ext"}
            ]}}
        }),
    );
    let (builder, _) = builder(&ws, &[(1, 1, 10), (1, 2, 20)]);

    builder.build(&recipe).await.unwrap();
    let first = fs::read_to_string(ws.catalogue_path()).unwrap();
    builder.build(&recipe).await.unwrap();
    let second = fs::read_to_string(ws.catalogue_path()).unwrap();

    assert_eq!(first, second);
    assert!(first.ends_with('\n'));
    assert!(first.contains("\n    \"samples\": {"));
}

#[tokio::test]
async fn test_unresolved_stage_drops_only_that_entry() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 1.0\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "ghost", "stage_name": "reco_missing"},
            {"sample_key": "nu", "stage_name": "reco_nu"}
        ]}}}),
    );
    let (builder, _) = builder(&ws, &[]);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    let samples = &catalogue.samples.beamlines["numi_fhc"]["run1"].samples;
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].sample_key.as_str(), "nu");
    assert_eq!(summary.entries_dropped(), 1);
    assert!(summary.dropped[0].reason.contains("reco_missing"));
    assert!(!summary.is_successful());
    assert!(ws.catalogue_path().exists());
}

#[tokio::test]
async fn test_ext_sample_counts_triggers_from_run_database() {
    let mut ws = Workspace::new();
    ws.stage(
        "reco_ext",
        &[
            ("a.root", "pair 1 1\npair 1 2\n"),
            ("b.root", "pair 1 2\npair 2 1\n"),
        ],
    );
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_ext": {"run1": {"ext_triggers": 999, "samples": [
            {"sample_key": "ext", "stage_name": "reco_ext", "sample_type": "ext"}
        ]}}}),
    );
    // (2, 1) is absent from the database and contributes nothing
    let (builder, _) = builder(&ws, &[(1, 1, 10), (1, 2, 20), (3, 1, 400)]);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    assert!(summary.is_successful());
    let entry = &catalogue.samples.beamlines["numi_ext"]["run1"].samples[0];
    assert_eq!(entry.pot, 0.0);
    assert_eq!(entry.triggers, Some(30));
}

#[tokio::test]
async fn test_ext_sample_with_missing_database_is_dropped() {
    let mut ws = Workspace::new();
    ws.stage("reco_ext", &[("a.root", "pair 1 1\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_ext": {"run1": {"samples": [
            {"sample_key": "ext", "stage_name": "reco_ext", "sample_type": "ext"}
        ]}}}),
    );
    let config = ws.config(ws.root().join("absent.db"));
    let tool = Arc::new(ConcatMergeTool::default());
    let collaborators = ws.collaborators(&config, tool);
    let builder = CatalogueBuilder::with_collaborators(config, collaborators);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    assert_eq!(catalogue.entry_count(), 0);
    assert_eq!(summary.entries_dropped(), 1);
    // The run is still emitted, with no samples
    assert!(catalogue.samples.beamlines["numi_ext"]["run1"].samples.is_empty());
}

#[tokio::test]
async fn test_data_samples_use_declared_normalization() {
    let mut ws = Workspace::new();
    ws.stage("reco_beam", &[("job1.root", "pot 7.0\n")])
        .stage("reco_offbeam", &[("job1.root", "pot 7.0\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({
            "numi_fhc": {"run1": {"pot": 1.5e20, "ext_triggers": 123, "samples": [
                {"sample_key": "beam", "stage_name": "reco_beam", "sample_type": "data"}
            ]}},
            "numi_ext": {"run1": {"pot": 9.0e20, "ext_triggers": 4567, "samples": [
                {"sample_key": "offbeam", "stage_name": "reco_offbeam", "sample_type": "data"}
            ]}}
        }),
    );
    let (builder, _) = builder(&ws, &[]);

    let (catalogue, _) = builder.build(&recipe).await.unwrap();

    let beam = &catalogue.samples.beamlines["numi_fhc"]["run1"].samples[0];
    assert_eq!(beam.pot, 1.5e20);
    assert_eq!(beam.triggers, Some(0));

    let offbeam = &catalogue.samples.beamlines["numi_ext"]["run1"].samples[0];
    assert_eq!(offbeam.pot, 0.0);
    assert_eq!(offbeam.triggers, Some(4567));

    // Run metadata is carried through unchanged
    let run = &catalogue.samples.beamlines["numi_fhc"]["run1"];
    assert_eq!(run.pot, Some(1.5e20));
    assert_eq!(run.ext_triggers, Some(123));
}

#[tokio::test]
async fn test_empty_stage_falls_back_to_run_exposure() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 2.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu"}
        ]}}}),
    );
    let (builder, tool) = builder(&ws, &[]);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    assert!(summary.is_successful());
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    let entry = &catalogue.samples.beamlines["numi_fhc"]["run1"].samples[0];
    assert_eq!(entry.pot, 2.0e20);
    assert!(!ws.ntuple_dir().join("nu.root").exists());
}

#[tokio::test]
async fn test_detector_variations_are_nested_and_failures_omitted() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 3.0\n")])
        .stage("detvar_cv", &[("job1.root", "pot 1.0\n"), ("job2.root", "pot 1.0\n")])
        .stage("detvar_sce", &[("job1.root", "pot 0.5\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu", "detector_variations": [
                {"sample_key": "nu_cv", "stage_name": "detvar_cv", "variation": "cv"},
                {"sample_key": "nu_wiremod", "stage_name": "detvar_missing"},
                {"sample_key": "nu_sce", "stage_name": "detvar_sce"},
                {"sample_key": "nu_off", "stage_name": "detvar_sce", "active": false}
            ]},
            {"sample_key": "plain", "stage_name": "reco_nu", "detector_variations": []}
        ]}}}),
    );
    let (builder, _) = builder(&ws, &[]);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    let samples = &catalogue.samples.beamlines["numi_fhc"]["run1"].samples;
    let variations = samples[0].detector_variations.as_ref().unwrap();
    let keys: Vec<&str> = variations.iter().map(|v| v.sample_key.as_str()).collect();
    assert_eq!(keys, vec!["nu_cv", "nu_sce"]);
    assert_eq!(variations[0].pot, 2.0);
    assert_eq!(variations[0].extra["variation"], "cv");
    assert_eq!(variations[1].pot, 0.5);

    assert_eq!(samples[1].detector_variations, None);
    assert_eq!(summary.entries_dropped(), 1);
    assert_eq!(summary.entries_skipped, 1);
    assert_eq!(catalogue.entry_count(), 4);
    assert!(ws.ntuple_dir().join("nu_sce.root").exists());
}

#[tokio::test]
async fn test_inactive_beamline_and_empty_runs_are_left_out() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 1.0\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({
            "bnb_fhc": {"active": false, "run1": {"pot": 1.0, "samples": [
                {"sample_key": "bnb_nu", "stage_name": "reco_nu"}
            ]}},
            "numi_fhc": {
                "run1": {"pot": 1.0, "samples": [{"sample_key": "nu", "stage_name": "reco_nu"}]},
                "run2": {"pot": 1.0, "samples": []}
            }
        }),
    );
    let (builder, _) = builder(&ws, &[]);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    assert!(!catalogue.samples.beamlines.contains_key("bnb_fhc"));
    assert!(!catalogue.samples.beamlines["numi_fhc"].contains_key("run2"));
    assert_eq!(summary.beamlines_skipped, 1);
    assert_eq!(summary.runs_skipped, 1);
    assert!(!ws.ntuple_dir().join("bnb_nu.root").exists());
}

#[tokio::test]
async fn test_recipe_values_for_computed_fields_are_replaced() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 2.0\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu",
             "pot": 5.0, "relative_path": "old.root", "triggers": 12, "generator": "genie"}
        ]}}}),
    );
    let (builder, _) = builder(&ws, &[]);

    builder.build(&recipe).await.unwrap();

    let text = fs::read_to_string(ws.catalogue_path()).unwrap();
    assert_eq!(text.matches("\"pot\"").count(), 2, "run pot and entry pot only");
    assert_eq!(text.matches("\"relative_path\"").count(), 1);
    assert!(!text.contains("\"triggers\""));

    let written = read_catalogue(&ws);
    let entry = &written["samples"]["beamlines"]["numi_fhc"]["run1"]["samples"][0];
    assert_eq!(entry["pot"], json!(2.0));
    assert_eq!(entry["relative_path"], json!("nu.root"));
    assert_eq!(entry["generator"], json!("genie"));
}

#[tokio::test]
async fn test_merge_and_stale_output_failures_drop_only_their_entries() {
    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 1.0\n")])
        .stage("reco_dirt", &[("job1.root", "pot 2.0\n")])
        .stage("reco_broken", &[("job1.root", "pot 3.0\n")])
        .stage("reco_stale", &[("job1.root", "pot 4.0\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu"},
            {"sample_key": "broken", "stage_name": "reco_broken"},
            {"sample_key": "stale", "stage_name": "reco_stale"},
            {"sample_key": "dirt", "stage_name": "reco_dirt"}
        ]}}}),
    );
    // A directory where the previous output should be cannot be removed
    fs::create_dir_all(ws.ntuple_dir().join("stale.root")).unwrap();
    fs::write(ws.ntuple_dir().join("stale.root").join("keep"), "x").unwrap();

    let config = ws.config(ws.write_run_db(&[]));
    let tool = Arc::new(FailingMergeTool::failing_for(&["broken.root"]));
    let collaborators = ws.collaborators(&config, tool);
    let builder = CatalogueBuilder::with_collaborators(config, collaborators);

    let (catalogue, summary) = builder.build(&recipe).await.unwrap();

    let samples = &catalogue.samples.beamlines["numi_fhc"]["run1"].samples;
    let keys: Vec<&str> = samples.iter().map(|s| s.sample_key.as_str()).collect();
    assert_eq!(keys, vec!["nu", "dirt"]);
    assert_eq!(samples[0].pot, 1.0);
    assert_eq!(samples[1].pot, 2.0);

    assert_eq!(summary.entries_annotated, 2);
    assert_eq!(summary.entries_dropped(), 2);
    let dropped: Vec<&str> = summary.dropped.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(dropped, vec!["numi_fhc/run1/broken", "numi_fhc/run1/stale"]);
    assert!(summary.dropped[0].reason.contains("Merge failed"));
    assert!(summary.dropped[1].reason.contains("stale.root"));
    assert!(!summary.is_successful());

    assert!(ws.ntuple_dir().join("stale.root").join("keep").exists());
    assert!(ws.catalogue_path().exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_read_only_output_directory_drops_entries_and_keeps_run() {
    use std::os::unix::fs::PermissionsExt;

    let mut ws = Workspace::new();
    ws.stage("reco_nu", &[("job1.root", "pot 1.0\n")]);
    let recipe = ws.write_recipe(
        "instance",
        json!({"numi_fhc": {"run1": {"pot": 1.0e20, "samples": [
            {"sample_key": "nu", "stage_name": "reco_nu"}
        ]}}}),
    );
    fs::create_dir_all(ws.ntuple_dir()).unwrap();
    fs::set_permissions(ws.ntuple_dir(), fs::Permissions::from_mode(0o555)).unwrap();

    // Permission bits do not bind a privileged user
    if tempfile::tempfile_in(ws.ntuple_dir()).is_ok() {
        fs::set_permissions(ws.ntuple_dir(), fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (builder, tool) = builder(&ws, &[]);
    let result = builder.build(&recipe).await;
    fs::set_permissions(ws.ntuple_dir(), fs::Permissions::from_mode(0o755)).unwrap();
    let (catalogue, summary) = result.unwrap();

    assert!(catalogue.samples.beamlines["numi_fhc"]["run1"].samples.is_empty());
    assert_eq!(summary.entries_dropped(), 1);
    assert!(summary.dropped[0].reason.contains("not writable"));
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}
