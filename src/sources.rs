use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::merge::{AudienceByDate, ResultsIndex, Standings};
use crate::normalize::normalize_team_name;
use crate::record::Score;

/// Row from the match agenda sheet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchSheetRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_raw: Option<String>,
    #[serde(default, rename = "match")]
    pub match_name: Option<String>,
    #[serde(default)]
    pub show_name: Option<String>,
    #[serde(default)]
    pub home_away: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default, alias = "Commentator 1")]
    pub commentator1: Option<String>,
    #[serde(default, alias = "Commentator 2")]
    pub commentator2: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub tv_channel: Option<String>,
    #[serde(default)]
    pub uitslag: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub sheet: Option<String>,
}

/// Row from the weekend show sheet: host/co-host instead of commentators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowSheetRow {
    #[serde(default, alias = "datum")]
    pub date: Option<String>,
    #[serde(default, rename = "wedstrijd weekend", alias = "match_weekend")]
    pub match_weekend: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, rename = "co-host", alias = "co_host")]
    pub co_host: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RawRecord {
    Match(MatchSheetRow),
    Show(ShowSheetRow),
}

/// Candidate staff fields in the order they are consulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaffFields {
    pub named: Vec<Option<String>>,
    /// "Name1 & Name2" in one cell, used only when no named field yields a name.
    pub combined: Option<String>,
}

/// Source-independent view of one metadata row, before any parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    pub date_text: Option<String>,
    pub season_start_year: Option<i32>,
    pub match_label: Option<String>,
    pub kickoff: Option<String>,
    pub competition: Option<String>,
    pub staff: StaffFields,
    pub channel: Option<String>,
    pub venue: Option<String>,
    pub score: Option<String>,
    pub result: Option<String>,
}

impl RawRecord {
    pub fn into_source(self) -> SourceRecord {
        match self {
            RawRecord::Match(row) => {
                let season_start_year = row.sheet.as_deref().and_then(season_start_year);
                SourceRecord {
                    date_text: non_blank(row.date).or_else(|| non_blank(row.date_raw)),
                    season_start_year,
                    match_label: non_blank(row.match_name).or_else(|| non_blank(row.show_name)),
                    kickoff: non_blank(row.time),
                    competition: non_blank(row.competition)
                        .or_else(|| non_blank(row.content_type)),
                    staff: StaffFields {
                        named: vec![row.commentator1, row.commentator2],
                        combined: row.host,
                    },
                    channel: non_blank(row.tv_channel),
                    venue: non_blank(row.home_away),
                    score: non_blank(row.uitslag),
                    result: non_blank(row.result),
                }
            }
            RawRecord::Show(row) => {
                let season_start_year = row.sheet.as_deref().and_then(season_start_year);
                let competition = row.items.as_deref().and_then(|items| {
                    items
                        .split(',')
                        .map(str::trim)
                        .find(|item| !item.is_empty())
                        .map(str::to_string)
                });
                SourceRecord {
                    date_text: non_blank(row.date),
                    season_start_year,
                    match_label: non_blank(row.match_weekend),
                    competition,
                    staff: StaffFields {
                        named: vec![row.host, row.co_host],
                        combined: None,
                    },
                    ..SourceRecord::default()
                }
            }
        }
    }
}

pub fn parse_match_sheet_json(raw: &str) -> Result<Vec<RawRecord>> {
    let rows: Vec<MatchSheetRow> = parse_rows(raw).context("invalid match sheet json")?;
    Ok(rows.into_iter().map(RawRecord::Match).collect())
}

pub fn parse_show_sheet_json(raw: &str) -> Result<Vec<RawRecord>> {
    let rows: Vec<ShowSheetRow> = parse_rows(raw).context("invalid show sheet json")?;
    Ok(rows.into_iter().map(RawRecord::Show).collect())
}

/// Sheet snapshots are either a bare list or wrapped as `{"all_data": [...]}`.
/// Rows that fail to decode are skipped rather than failing the file.
fn parse_rows<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<Vec<T>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(trimmed)?;
    let rows = match &value {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(map) => map
            .get("all_data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };
    Ok(rows
        .iter()
        .filter_map(|row| serde_json::from_value::<T>(row.clone()).ok())
        .collect())
}

/// Per-date listener counts. Accepts a bare list or `{"sample_data": [...]}`.
pub fn parse_listener_snapshot(raw: &str) -> Result<AudienceByDate> {
    let trimmed = raw.trim();
    let mut out = BTreeMap::new();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(out);
    }
    let value: Value = serde_json::from_str(trimmed).context("invalid listener json")?;
    let rows = match &value {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(map) => map
            .get("sample_data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };
    for row in rows {
        let date = row
            .get("date")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| row.get("date_parsed").and_then(Value::as_str));
        let Some(date) = date.and_then(parse_iso_date) else {
            continue;
        };
        let Some(listeners) = row.get("listeners").and_then(as_count) else {
            continue;
        };
        out.insert(date, listeners);
    }
    Ok(out)
}

/// Final scores keyed by match date and canonical opponent key.
pub fn parse_results_snapshot(raw: &str) -> Result<ResultsIndex> {
    let trimmed = raw.trim();
    let mut out = ResultsIndex::new();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(out);
    }
    let value: Value = serde_json::from_str(trimmed).context("invalid results json")?;
    for row in value.as_array().map(Vec::as_slice).unwrap_or_default() {
        let Some(date) = row.get("date").and_then(Value::as_str).and_then(parse_iso_date) else {
            continue;
        };
        let Some(opponent) = row.get("opponent").and_then(Value::as_str) else {
            continue;
        };
        let key = normalize_team_name(opponent);
        if key.is_empty() {
            continue;
        }
        let Some(score) = row.get("score").and_then(Value::as_str).and_then(Score::parse) else {
            continue;
        };
        out.insert((date, key), score);
    }
    Ok(out)
}

/// League positions keyed by canonical team key. Rows carry `rank` or `position`.
pub fn parse_standings_snapshot(raw: &str) -> Result<Standings> {
    let trimmed = raw.trim();
    let mut out = Standings::new();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(out);
    }
    let value: Value = serde_json::from_str(trimmed).context("invalid standings json")?;
    for row in value.as_array().map(Vec::as_slice).unwrap_or_default() {
        let Some(team) = row.get("team").and_then(Value::as_str) else {
            continue;
        };
        let rank = row
            .get("rank")
            .or_else(|| row.get("position"))
            .and_then(as_count);
        let key = normalize_team_name(team);
        if let Some(rank) = rank
            && !key.is_empty()
        {
            out.insert(key, rank);
        }
    }
    Ok(out)
}

/// Normalize the date formats found across sheets: `D/M/YYYY`, ISO with an
/// optional time suffix, Dutch short form ("za., 12 jul.") dated by the
/// season, and Dutch long form ("4 augustus 2023").
pub fn parse_sheet_date(raw: &str, season_start_year: Option<i32>) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_day_month_year(s)
        .or_else(|| parse_iso_date(s))
        .or_else(|| parse_dutch_short(s, season_start_year))
        .or_else(|| parse_dutch_long(s))
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let day_part = s.split('T').next()?;
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

/// "Radio 24/25" -> 2024.
pub fn season_start_year(sheet_name: &str) -> Option<i32> {
    let bytes = sheet_name.as_bytes();
    for idx in 0..bytes.len().saturating_sub(4) {
        let window = &bytes[idx..idx + 5];
        if window[0].is_ascii_digit()
            && window[1].is_ascii_digit()
            && window[2] == b'/'
            && window[3].is_ascii_digit()
            && window[4].is_ascii_digit()
        {
            let start = sheet_name.get(idx..idx + 2)?.parse::<i32>().ok()?;
            return Some(2000 + start);
        }
    }
    None
}

fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    let mut parts = s.splitn(3, '/');
    let day = parts.next()?;
    let month = parts.next()?;
    let rest = parts.next()?;
    if !(1..=2).contains(&day.len()) || !(1..=2).contains(&month.len()) {
        return None;
    }
    let year = rest.get(..4)?;
    if !year.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

fn dutch_month_short(token: &str) -> Option<u32> {
    let prefix: String = token.chars().take(3).collect();
    match prefix.as_str() {
        "jan" => Some(1),
        "feb" => Some(2),
        "mrt" | "maa" => Some(3),
        "apr" => Some(4),
        "mei" => Some(5),
        "jun" => Some(6),
        "jul" => Some(7),
        "aug" => Some(8),
        "sep" => Some(9),
        "okt" => Some(10),
        "nov" => Some(11),
        "dec" => Some(12),
        _ => None,
    }
}

fn dutch_month_long(token: &str) -> Option<u32> {
    match token {
        "januari" => Some(1),
        "februari" => Some(2),
        "maart" => Some(3),
        "april" => Some(4),
        "mei" => Some(5),
        "juni" => Some(6),
        "juli" => Some(7),
        "augustus" => Some(8),
        "september" => Some(9),
        "oktober" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

/// Seasons start in July: Jul-Dec fall in the start year, Jan-Jun in the next.
fn parse_dutch_short(s: &str, season_start_year: Option<i32>) -> Option<NaiveDate> {
    let start_year = season_start_year?;
    let lower = s.to_lowercase();
    // Drop a leading weekday abbreviation such as "za.," or "wo".
    let body = lower.trim_start_matches(|ch: char| ch.is_alphabetic());
    let body = body.trim_start_matches(['.', ',', ' ']);
    let mut tokens = body.split_whitespace();
    let day = tokens.next()?.parse::<u32>().ok()?;
    let month_token = tokens.next()?.trim_end_matches('.');
    let month = dutch_month_short(month_token)?;
    let year = if month >= 7 { start_year } else { start_year + 1 };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_dutch_long(s: &str) -> Option<NaiveDate> {
    let lower = s.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }
    let day = tokens[0].parse::<u32>().ok()?;
    let month = dutch_month_long(tokens[1])?;
    let year = tokens[2].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn as_count(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    if let Some(f) = v.as_f64() {
        if f.is_finite() && f >= 0.0 && f <= u32::MAX as f64 {
            return Some(f as u32);
        }
        return None;
    }
    v.as_str()?.trim().parse::<u32>().ok()
}
