#[allow(dead_code)]
mod common;

use std::fs;
use std::path::{Path, PathBuf};

use hiedr_core::error::MosaicError;
use hiedr_core::pipeline::Stage;
use hiedr_core::registry::UnitRegistry;
use hiedr_core::report::PairOffset;
use hiedr_core::stage::{pair_channels, verify_outputs};

use common::{
    both_channels, config_in, context, report_text, write_ccd_files, write_raw_channels,
    FakeExecutor, OBSERVATION,
};

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Conversion and calibration
// ---------------------------------------------------------------------------

#[test]
fn test_convert_writes_cubes_into_output_dir() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let images = write_raw_channels(raw.path(), &[(4, 0), (4, 1)]);

    let executor = FakeExecutor::new();
    let ctx = context(&config_in(out.path(), images.clone()), &executor);
    let cubes = ctx.convert(&images).unwrap();

    assert_eq!(
        names(&cubes),
        [format!("{OBSERVATION}_RED4_0.cub"), format!("{OBSERVATION}_RED4_1.cub")]
    );
    assert!(cubes.iter().all(|c| c.parent() == Some(out.path())));
    assert!(images.iter().all(|i| i.exists()), "raw inputs are kept");
}

#[test]
fn test_second_run_skips_existing_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_raw_channels(dir.path(), &both_channels(0..=2));

    let executor = FakeExecutor::new();
    let ctx = context(&config_in(dir.path(), images.clone()), &executor);
    let first = ctx.convert(&images).unwrap();
    assert_eq!(executor.launched_tool("hi2isis").len(), 6);

    let second = ctx.convert(&images).unwrap();
    assert_eq!(first, second);
    assert_eq!(executor.launched_tool("hi2isis").len(), 6, "nothing resubmitted");
}

#[test]
fn test_calibrate_removes_inputs_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let cubes = write_ccd_files(dir.path(), &[0, 1], "_0.cub");
    let log = dir.path().join(format!("{OBSERVATION}_RED0_0.hical.log"));
    fs::write(&log, "log").unwrap();

    let executor = FakeExecutor::new();
    let ctx = context(&config_in(dir.path(), cubes.clone()), &executor);
    let calibrated = ctx.calibrate(&cubes).unwrap();

    assert_eq!(
        names(&calibrated),
        [format!("{OBSERVATION}_RED0_0.hical.cub"), format!("{OBSERVATION}_RED1_0.hical.cub")]
    );
    assert!(cubes.iter().all(|c| !c.exists()));
    assert!(!log.exists());
}

#[test]
fn test_calibrate_keeps_intermediates_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let cubes = write_ccd_files(dir.path(), &[0, 1], "_0.cub");

    let executor = FakeExecutor::new();
    let mut config = config_in(dir.path(), cubes.clone());
    config.keep_intermediates = true;
    let ctx = context(&config, &executor);
    ctx.calibrate(&cubes).unwrap();

    assert!(cubes.iter().all(|c| c.exists()));
}

#[test]
fn test_failed_tool_reports_missing_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let cubes = write_ccd_files(dir.path(), &[2, 3], "_1.cub");

    let executor = FakeExecutor::failing(&["hical"]);
    let ctx = context(&config_in(dir.path(), cubes.clone()), &executor);
    let err = ctx.calibrate(&cubes).unwrap_err();

    match err {
        MosaicError::StageOutputMissing { stage, missing } => {
            assert_eq!(stage, Stage::Calibration);
            assert_eq!(missing.len(), 2);
        }
        other => panic!("expected StageOutputMissing, got {other:?}"),
    }
    assert!(cubes.iter().all(|c| c.exists()), "inputs survive a failed wave");
}

#[test]
fn test_tool_dir_prefixes_program() {
    let dir = tempfile::tempdir().unwrap();
    let images = write_raw_channels(dir.path(), &[(5, 0)]);

    let executor = FakeExecutor::new();
    let mut config = config_in(dir.path(), images.clone());
    config.tool_dir = Some(PathBuf::from("/opt/isis/bin"));
    let ctx = context(&config, &executor);
    let job = ctx.plan_conversion(&images[0]).unwrap();

    assert_eq!(Path::new(&job.command.program), Path::new("/opt/isis/bin/hi2isis"));
}

#[test]
fn test_verify_outputs_lists_only_missing() {
    let dir = tempfile::tempdir().unwrap();
    let present = write_ccd_files(dir.path(), &[1], ".cub");
    let absent = dir.path().join("absent.cub");
    let expected = vec![present[0].clone(), absent.clone()];

    let err = verify_outputs(Stage::Conversion, &expected).unwrap_err();
    match err {
        MosaicError::StageOutputMissing { missing, .. } => assert_eq!(missing, vec![absent]),
        other => panic!("expected StageOutputMissing, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Stitching
// ---------------------------------------------------------------------------

#[test]
fn test_pair_channels_groups_by_ccd() {
    let files = [
        "o/X_RED0_0.hical.cub",
        "o/X_RED0_1.hical.cub",
        "o/X_RED2_0.hical.cub",
    ];
    let pairs = pair_channels(&files).unwrap();

    assert_eq!(pairs.prefix, "o/X_RED");
    assert_eq!(pairs.units.len(), 2);
    assert!(pairs.units[&0].iter().all(Option::is_some));
    assert_eq!(pairs.units[&2], [Some(PathBuf::from(files[2])), None]);
}

#[test]
fn test_pair_channels_rejects_bad_channel() {
    let files = ["X_RED0_0.cub", "X_RED0_2.cub"];
    let err = pair_channels(&files).unwrap_err();
    assert!(matches!(err, MosaicError::MalformedFilename(_)), "got {err:?}");
}

#[test]
fn test_pair_channels_rejects_repeated_channel() {
    let files = ["a/X_RED1_0.cub", "b/X_RED1_0.cub"];
    // The shared prefix stops at the directory, so no marker follows it.
    assert!(pair_channels(&files).is_err());

    let files = ["X_RED1_0.cub", "X_RED1_0.cub"];
    let err = pair_channels(&files).unwrap_err();
    assert!(matches!(err, MosaicError::DuplicateUnit { id: 1, .. }), "got {err:?}");
}

#[test]
fn test_single_channel_is_stitched_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = write_ccd_files(dir.path(), &[1], "_0.hical.cub");
    files.extend(write_ccd_files(dir.path(), &[1], "_1.hical.cub"));
    files.extend(write_ccd_files(dir.path(), &[2], "_0.hical.cub"));

    let executor = FakeExecutor::new();
    let ctx = context(&config_in(dir.path(), files.clone()), &executor);
    let stitched = ctx.stitch(&files).unwrap();

    assert_eq!(
        names(&stitched),
        [format!("{OBSERVATION}_RED1.histitch.cub"), format!("{OBSERVATION}_RED2.histitch.cub")]
    );
    let jobs = executor.launched_tool("histitch");
    assert_eq!(jobs.len(), 2);
    assert!(jobs[0].value_of("balance").is_some_and(|b| b == "TRUE"));
    assert!(jobs[0].value_of("from2").is_some());
    assert!(jobs[1].value_of("from2").is_none());
    assert!(jobs[1].value_of("balance").is_none());
    assert!(files.iter().all(|f| !f.exists()));
}

#[test]
fn test_single_channel_plan_carries_warning() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = write_ccd_files(dir.path(), &[1], "_0.hical.cub");
    files.extend(write_ccd_files(dir.path(), &[1], "_1.hical.cub"));
    files.extend(write_ccd_files(dir.path(), &[2], "_0.hical.cub"));

    let executor = FakeExecutor::new();
    let ctx = context(&config_in(dir.path(), files.clone()), &executor);
    let plans = ctx.plan_stitching(&pair_channels(&files).unwrap());

    assert_eq!(plans.len(), 2);
    assert!(plans[0].warning.is_none());
    assert_eq!(plans[0].consumed, vec![files[0].clone(), files[1].clone()]);

    let warning = plans[1].warning.as_deref().unwrap();
    assert!(warning.contains("not the matching channel file"), "{warning}");
    assert!(warning.contains(&files[2].display().to_string()), "{warning}");
    assert_eq!(plans[1].consumed, vec![files[2].clone()]);
    assert!(executor.launched().is_empty(), "planning launches nothing");
}

// ---------------------------------------------------------------------------
// SPICE
// ---------------------------------------------------------------------------

#[test]
fn test_spice_runs_init_then_fit() {
    let dir = tempfile::tempdir().unwrap();
    let cubes = write_ccd_files(dir.path(), &[4, 5], ".histitch.cub");

    let executor = FakeExecutor::new();
    let mut config = config_in(dir.path(), cubes.clone());
    config.web_kernels = true;
    let ctx = context(&config, &executor);
    ctx.attach_spice(&cubes).unwrap();

    let programs: Vec<String> = executor.launched().iter().map(|c| c.program.clone()).collect();
    assert_eq!(programs, ["spiceinit", "spiceinit", "spicefit", "spicefit"]);
    let init = executor.launched_tool("spiceinit");
    assert!(init[0].value_of("web").is_some_and(|w| w == "TRUE"));
    assert!(cubes.iter().all(|c| c.exists()));
}

// ---------------------------------------------------------------------------
// Geometry correction and registration
// ---------------------------------------------------------------------------

#[test]
fn test_geometry_correction_matches_reference() {
    let dir = tempfile::tempdir().unwrap();
    let stitched = write_ccd_files(dir.path(), &[4, 5, 6], ".histitch.cub");
    let registry = UnitRegistry::build(&stitched, 5).unwrap();

    let executor = FakeExecutor::new();
    let ctx = context(&config_in(dir.path(), stitched.clone()), &executor);
    let projected = ctx.correct_geometry(&registry).unwrap();

    assert_eq!(projected.ids().collect::<Vec<_>>(), vec![4, 5, 6]);
    assert!(projected
        .reference_filename()
        .unwrap()
        .to_string_lossy()
        .ends_with("_RED5.noproj.cub"));

    let reference = std::path::absolute(&stitched[1]).unwrap();
    for command in executor.launched_tool("noproj") {
        assert_eq!(command.value_of("match").map(PathBuf::from), Some(reference.clone()));
        assert!(command.value_of("source").is_some_and(|s| s == "frommatch"));
        let scratch = command.scratch_dir.unwrap();
        assert!(scratch.is_absolute());
        assert!(scratch.file_name().unwrap().to_string_lossy().starts_with("tmp_"));
    }
    assert!(stitched.iter().all(|s| !s.exists()));
}

#[test]
fn test_register_reads_offsets_and_removes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let projected = write_ccd_files(dir.path(), &[3, 4, 5, 7], ".noproj.cub");
    let registry = UnitRegistry::build(&projected, 5).unwrap();

    let registered = report_text(2.0, 0.5);
    let executor = FakeExecutor::new().with_reports(&[
        ("flat_3_4.txt", registered.as_str()),
        ("flat_4_5.txt", "no offsets here\n"),
    ]);
    let ctx = context(&config_in(dir.path(), projected.clone()), &executor);
    let table = ctx.register(&registry).unwrap();

    assert_eq!(executor.launched_tool("hijitreg").len(), 2, "no pair across the gap");
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(3), Some(PairOffset::new(2.0, 0.5)));
    assert_eq!(table.get(4), Some(PairOffset::new(0.0, 0.0)));
    assert!(!dir.path().join("flat_3_4.txt").exists());
    assert!(projected.iter().all(|p| p.exists()));
}
