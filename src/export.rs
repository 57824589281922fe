use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;

use crate::aggregate::AggregateTable;
use crate::merge::MergeSummary;
use crate::persist::write_atomic;
use crate::pipeline::RunOutput;
use crate::predictor::PredictionReport;
use crate::views::{MatchRow, RunSummary};

#[derive(Debug, Clone, Serialize)]
struct SummaryFile<'a> {
    summary: &'a RunSummary,
    merge: &'a MergeSummary,
    snapshot_digest: Option<&'a str>,
}

/// One pretty JSON file per table plus listings, summary and predictions.
pub fn write_reports(
    dir: &Path,
    output: &RunOutput,
    snapshot_digest: Option<&str>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut written = Vec::new();
    for table in &output.tables {
        written.push(write_json(dir, &table.name, table)?);
    }
    written.push(write_json(dir, "all_matches", &output.matches)?);
    written.push(write_json(dir, "top_games", &output.top_games)?);
    written.push(write_json(dir, "predictions", &output.predictions)?);
    written.push(write_json(
        dir,
        "summary",
        &SummaryFile {
            summary: &output.summary,
            merge: &output.merge,
            snapshot_digest,
        },
    )?);
    Ok(written)
}

pub fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(format!("{name}.json"));
    let json = serde_json::to_vec_pretty(value).with_context(|| format!("serialize {name}"))?;
    write_atomic(&path, &json)?;
    Ok(path)
}

/// Workbook with one sheet per aggregate table, then "Matches" and "Predictions".
pub fn write_workbook(path: &Path, output: &RunOutput) -> Result<()> {
    let mut workbook = Workbook::new();
    for table in &output.tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&table.name))?;
        write_rows(sheet, &table_rows(table))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matches")?;
        write_rows(sheet, &match_rows(&output.matches))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Predictions")?;
        write_rows(sheet, &prediction_rows(&output.predictions))?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

/// Excel caps sheet names at 31 characters.
fn sheet_name(name: &str) -> String {
    name.chars().take(31).collect()
}

fn table_rows(table: &AggregateTable) -> Vec<Vec<String>> {
    let mut rows = vec![header(&["Key", "Matches", "Min", "Avg", "Median", "Max"])];
    rows.extend(table.buckets.iter().map(|b| {
        vec![
            b.key.clone(),
            b.matches_count.to_string(),
            fmt_number(b.min),
            fmt_number(b.avg),
            fmt_number(b.median),
            fmt_number(b.max),
        ]
    }));
    rows.push(vec![
        "Excluded (no listeners)".to_string(),
        table.excluded_null_listeners.to_string(),
    ]);
    rows
}

fn match_rows(matches: &[MatchRow]) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Date",
        "Weekday",
        "Kickoff",
        "Match",
        "Commentators",
        "Listeners",
        "Competition",
        "Channel",
        "Score",
        "Result",
        "Venue",
        "Opponent Rank",
    ])];
    rows.extend(matches.iter().map(|m| {
        vec![
            m.date.to_string(),
            m.weekday.clone(),
            m.kickoff.clone().unwrap_or_default(),
            m.match_label.clone(),
            m.staff.clone(),
            opt_to_string(m.audience),
            m.competition.clone().unwrap_or_default(),
            m.channel.clone().unwrap_or_default(),
            m.score.clone().unwrap_or_default(),
            m.result.clone().unwrap_or_default(),
            m.venue.clone().unwrap_or_default(),
            opt_to_string(m.opponent_rank),
        ]
    }));
    rows
}

fn prediction_rows(report: &PredictionReport) -> Vec<Vec<String>> {
    let mut rows = vec![header(&[
        "Date",
        "Weekday",
        "Kickoff",
        "Match",
        "Commentators",
        "Predicted Listeners",
        "Method",
    ])];
    rows.extend(report.future.iter().map(|p| {
        vec![
            p.date.to_string(),
            p.weekday.clone(),
            p.kickoff.clone().unwrap_or_default(),
            p.match_label.clone(),
            p.staff.join(" & "),
            opt_to_string(p.predicted_audience),
            p.method
                .and_then(|m| serde_json::to_value(m).ok())
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
        ]
    }));
    rows
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
