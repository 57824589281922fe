use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::aggregate::AggregateTable;
use crate::config::Config;
use crate::fetch;
use crate::merge::{AudienceByDate, MergeSummary, Reconciler, ResultsIndex, Standings};
use crate::predictor::{PredictionReport, Predictor};
use crate::record::EventRecord;
use crate::sources::SourceRecord;
use crate::views::{
    MatchRow, RunSummary, TOP_GAMES_PER_SEASON, all_matches, compute_views, top_games_by_season,
};

/// Everything the pure analysis step needs, already parsed.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub audience: AudienceByDate,
    pub metadata: Vec<SourceRecord>,
    pub results: ResultsIndex,
    pub standings: Standings,
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions<'a> {
    pub subject_team: &'a str,
    pub today: NaiveDate,
    pub top_limit: usize,
    pub calibration_rows: usize,
}

impl<'a> AnalysisOptions<'a> {
    pub fn from_config(config: &'a Config) -> Self {
        Self {
            subject_team: &config.subject_team,
            today: config.reference_date(),
            top_limit: config.top_limit,
            calibration_rows: config.calibration_rows,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub records: Vec<EventRecord>,
    pub merge: MergeSummary,
    pub tables: Vec<AggregateTable>,
    pub matches: Vec<MatchRow>,
    pub top_games: BTreeMap<String, Vec<MatchRow>>,
    pub summary: RunSummary,
    pub predictions: PredictionReport,
}

pub fn load_inputs(config: &Config) -> Result<Inputs> {
    let sheets = fetch::load_sheets(&config.sheet_path, config.shows_path.as_deref())?;
    Ok(Inputs {
        audience: fetch::load_listeners(&config.listeners_path),
        metadata: sheets.into_iter().map(|row| row.into_source()).collect(),
        results: fetch::load_results(config.results_path.as_deref()),
        standings: fetch::load_standings(
            config.standings_path.as_deref(),
            config.standings_url.as_deref(),
        ),
    })
}

/// Merge, enrich, aggregate and predict. Pure over its inputs.
pub fn analyze(inputs: &Inputs, options: AnalysisOptions<'_>) -> RunOutput {
    let reconciler = Reconciler::new(options.subject_team);
    let merged = reconciler.merge(&inputs.audience, &inputs.metadata, &inputs.results);
    let mut records = merged.records;
    reconciler.attach_opponents(&mut records, &inputs.standings);

    let tables = compute_views(&records, options.top_limit);
    info!(tables = tables.len(), "aggregate views computed");

    let predictions = Predictor::new(options.today, options.calibration_rows).run(&records);

    RunOutput {
        matches: all_matches(&records),
        top_games: top_games_by_season(&records, TOP_GAMES_PER_SEASON),
        summary: RunSummary::of(&records),
        merge: merged.summary,
        tables,
        predictions,
        records,
    }
}
