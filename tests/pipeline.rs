use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use matchday_audience::merge::Reconciler;
use matchday_audience::persist::canonical_bytes;
use matchday_audience::pipeline::{AnalysisOptions, Inputs, RunOutput, analyze};
use matchday_audience::predictor::{ModelStatus, PredictionMethod};
use matchday_audience::record::{Outcome, Score};
use matchday_audience::sources::{
    parse_listener_snapshot, parse_match_sheet_json, parse_results_snapshot,
    parse_show_sheet_json, parse_standings_snapshot,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fixture_inputs() -> Inputs {
    let mut rows = parse_match_sheet_json(&read_fixture("match_sheet.json")).expect("match sheet");
    rows.extend(parse_show_sheet_json(&read_fixture("show_sheet.json")).expect("show sheet"));
    Inputs {
        audience: parse_listener_snapshot(&read_fixture("listeners.json")).expect("listeners"),
        metadata: rows.into_iter().map(|r| r.into_source()).collect(),
        results: parse_results_snapshot(&read_fixture("results.json")).expect("results"),
        standings: parse_standings_snapshot(&read_fixture("standings.json")).expect("standings"),
    }
}

fn run() -> RunOutput {
    analyze(
        &fixture_inputs(),
        AnalysisOptions {
            subject_team: "Ajax",
            today: ymd(2025, 1, 1),
            top_limit: 20,
            calibration_rows: 10,
        },
    )
}

#[test]
fn reconciliation_drops_duplicates_and_unstaffed_rows() {
    let output = run();
    let labels: Vec<&str> = output.records.iter().map(|r| r.match_label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Ajax - PSV Eindhoven",
            "Ajax - FC Twente",
            "NEC - Ajax",
            "Sparta Rotterdam - Ajax",
            "Ajax - Heracles Almelo",
            "Ajax - Feyenoord",
        ]
    );
    let summary = &output.merge;
    assert_eq!(summary.input, 9);
    assert_eq!(summary.kept, 6);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.no_staff, 1);
    assert_eq!(summary.bad_date, 1);
    assert_eq!(summary.scores_filled, 1);
    assert_eq!(summary.outcomes_derived, 3);

    let first = &output.records[0];
    assert_eq!(first.kickoff.as_deref(), Some("18:45"));
    assert_eq!(first.staff, vec!["Kees".to_string(), "Anna".to_string()]);
}

#[test]
fn en_dash_score_at_home_is_a_win() {
    let output = run();
    let psv = &output.records[0];
    assert_eq!(psv.score, Some(Score::new(2, 1)));
    assert_eq!(psv.outcome, Some(Outcome::Win));
    assert_eq!(psv.audience, Some(1500));
    assert_eq!(psv.opponent.as_deref(), Some("PSV Eindhoven"));
    assert_eq!(psv.opponent_rank, Some(1));
}

#[test]
fn missing_scores_come_from_results_and_label_position() {
    let output = run();
    let twente = &output.records[1];
    assert_eq!(twente.score, Some(Score::new(1, 1)));
    assert_eq!(twente.outcome, Some(Outcome::Draw));
    assert_eq!(twente.opponent_rank, Some(3));

    let nec = &output.records[2];
    assert_eq!(nec.date, ymd(2024, 8, 24));
    assert_eq!(nec.venue, None);
    assert_eq!(nec.outcome, Some(Outcome::Win));
    assert_eq!(nec.staff, vec!["Anna".to_string(), "Wim".to_string()]);
    assert_eq!(nec.competition.as_deref(), Some("Eredivisie"));

    let show = &output.records[4];
    assert_eq!(show.staff, vec!["Wim".to_string()]);
    assert_eq!(show.audience, None);
}

#[test]
fn merge_is_byte_identical_across_runs() {
    let inputs = fixture_inputs();
    let reconciler = Reconciler::new("Ajax");
    let a = reconciler.merge(&inputs.audience, &inputs.metadata, &inputs.results);
    let b = reconciler.merge(&inputs.audience, &inputs.metadata, &inputs.results);
    assert_eq!(
        canonical_bytes(&a.records).unwrap(),
        canonical_bytes(&b.records).unwrap()
    );
    assert_eq!(canonical_bytes(&run().records).unwrap(), canonical_bytes(&run().records).unwrap());
}

#[test]
fn every_table_accounts_for_excluded_rows() {
    let output = run();
    assert_eq!(output.summary.total, 6);
    assert_eq!(output.summary.included, 3);
    assert_eq!(output.summary.excluded_null_listeners, 3);
    for table in &output.tables {
        assert_eq!(table.excluded_null_listeners, 3, "{}", table.name);
        for bucket in &table.buckets {
            assert!(bucket.min <= bucket.median && bucket.median <= bucket.max);
            assert!(bucket.min <= bucket.avg + 0.005 && bucket.avg <= bucket.max + 0.005);
        }
    }

    let by_name = |name: &str| {
        output
            .tables
            .iter()
            .find(|t| t.name == name)
            .unwrap_or_else(|| panic!("missing table {name}"))
    };
    let full = by_name("commentators_full_credit");
    assert_eq!(full.included + full.excluded_null_listeners, output.records.len());

    let blocks = by_name("kickoff_blocks");
    let keys: Vec<&str> = blocks.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["18:00-19:59", "20:00-20:59", "15:00-17:59"]);

    let results = by_name("by_result");
    assert_eq!(results.buckets[0].key, "W");
    assert_eq!(results.buckets[0].avg, 1300.0);

    let duos = by_name("commentator_duos");
    let keys: Vec<&str> = duos.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["Anna & Kees", "Anna & Wim"]);

    let tv = by_name("by_tv_category");
    let keys: Vec<&str> = tv.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["Half-open", "Open", "Paid"]);
}

#[test]
fn infeasible_model_falls_back_for_future_matches() {
    let output = run();
    let report = &output.predictions;
    assert!(matches!(report.status, ModelStatus::Infeasible { .. }));
    assert_eq!(report.training_rows, 3);
    assert_eq!(report.future.len(), 1);

    let feyenoord = &report.future[0];
    assert_eq!(feyenoord.match_label, "Ajax - Feyenoord");
    assert_eq!(feyenoord.opponent_rank, Some(2));
    assert_eq!(feyenoord.method, Some(PredictionMethod::OverallAverage));
    assert_eq!(feyenoord.predicted_audience, Some(1267));
    assert_eq!(report.recent.len(), 3);
}

#[test]
fn listings_and_top_games() {
    let output = run();
    assert_eq!(output.matches[0].date, ymd(2025, 1, 19));
    let season = output.top_games.get("2024/2025").expect("season present");
    let audiences: Vec<Option<u32>> = season.iter().map(|m| m.audience).collect();
    assert_eq!(audiences, vec![Some(1500), Some(1200), Some(1100)]);
}
