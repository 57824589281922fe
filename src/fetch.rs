use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::http;
use crate::merge::{AudienceByDate, ResultsIndex, Standings};
use crate::sources::{
    RawRecord, parse_listener_snapshot, parse_match_sheet_json, parse_results_snapshot,
    parse_show_sheet_json, parse_standings_snapshot,
};

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))
}

/// Match sheet rows, then show sheet rows when a show export is given.
pub fn load_sheets(sheet_path: &Path, shows_path: Option<&Path>) -> Result<Vec<RawRecord>> {
    let raw = read_text(sheet_path)?;
    let mut rows = parse_match_sheet_json(&raw)
        .with_context(|| format!("failed parsing match sheet {}", sheet_path.display()))?;
    if let Some(path) = shows_path {
        let raw = read_text(path)?;
        let shows = parse_show_sheet_json(&raw)
            .with_context(|| format!("failed parsing show sheet {}", path.display()))?;
        rows.extend(shows);
    }
    info!(rows = rows.len(), "loaded sheet rows");
    Ok(rows)
}

/// Listener counts per date. Unreadable sources give an empty map.
pub fn load_listeners(path: &Path) -> AudienceByDate {
    degrade("listeners", || parse_listener_snapshot(&read_text(path)?))
}

pub fn load_results(path: Option<&Path>) -> ResultsIndex {
    match path {
        Some(path) => degrade("results", || parse_results_snapshot(&read_text(path)?)),
        None => ResultsIndex::new(),
    }
}

/// A standings file wins over the URL; neither means no opponent ranks.
pub fn load_standings(path: Option<&Path>, url: Option<&str>) -> Standings {
    match (path, url) {
        (Some(path), _) => degrade("standings", || parse_standings_snapshot(&read_text(path)?)),
        (None, Some(url)) => degrade("standings", || {
            let body = http::get_text_cached(url)?;
            parse_standings_snapshot(&body)
        }),
        (None, None) => Standings::new(),
    }
}

fn degrade<T: Default>(source: &str, load: impl FnOnce() -> Result<T>) -> T {
    match load() {
        Ok(value) => value,
        Err(err) => {
            warn!(source, error = %format!("{err:#}"), "source unavailable, continuing without it");
            T::default()
        }
    }
}
