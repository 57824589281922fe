use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;

use matchday_audience::export::{write_reports, write_workbook};
use matchday_audience::fetch::{load_listeners, load_results, load_sheets, load_standings};
use matchday_audience::persist::{read_snapshot, write_snapshot};
use matchday_audience::pipeline::{AnalysisOptions, Inputs, analyze};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("matchday_audience_it_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn reports_snapshot_and_workbook_are_written() {
    let shows = fixture("show_sheet.json");
    let sheets =
        load_sheets(&fixture("match_sheet.json"), Some(shows.as_path())).expect("sheets load");
    let inputs = Inputs {
        audience: load_listeners(&fixture("listeners.json")),
        metadata: sheets.into_iter().map(|r| r.into_source()).collect(),
        results: load_results(Some(fixture("results.json").as_path())),
        standings: load_standings(Some(fixture("standings.json").as_path()), None),
    };
    let output = analyze(
        &inputs,
        AnalysisOptions {
            subject_team: "Ajax",
            today: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            top_limit: 20,
            calibration_rows: 10,
        },
    );

    let dir = scratch_dir("reports");
    let snapshot = write_snapshot(&dir, &output.records).expect("snapshot written");
    assert_eq!(read_snapshot(&snapshot.path).expect("snapshot readable"), output.records);

    let written = write_reports(&dir, &output, Some(&snapshot.digest)).expect("reports written");
    assert_eq!(written.len(), output.tables.len() + 4);
    for path in &written {
        assert!(path.exists(), "{}", path.display());
    }

    let raw = fs::read_to_string(dir.join("kickoff_blocks.json")).unwrap();
    let table: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(table["name"], "kickoff_blocks");
    assert_eq!(table["excluded_null_listeners"], 3);
    assert!(table["buckets"][0]["matches_count"].is_u64());

    let raw = fs::read_to_string(dir.join("summary.json")).unwrap();
    let summary: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(summary["snapshot_digest"], snapshot.digest.as_str());
    assert_eq!(summary["merge"]["duplicates"], 1);

    let raw = fs::read_to_string(dir.join("predictions.json")).unwrap();
    let predictions: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(predictions["status"]["status"], "infeasible");
    assert_eq!(predictions["future"][0]["method"], "overall_average");

    let workbook = dir.join("report.xlsx");
    write_workbook(&workbook, &output).expect("workbook written");
    assert!(fs::metadata(&workbook).unwrap().len() > 0);

    let _ = fs::remove_dir_all(&dir);
}
