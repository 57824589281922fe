use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;

/// Matchday radio audience analysis
#[derive(Parser, Debug, Clone)]
#[command(name = "matchday_audience", version, about)]
pub struct Config {
    /// Team whose broadcasts are analysed
    #[arg(long, env = "SUBJECT_TEAM", default_value = "Ajax")]
    pub subject_team: String,

    /// Listener snapshot (JSON list or {sample_data})
    #[arg(long, env = "LISTENERS_PATH", default_value = "data/listeners.json")]
    pub listeners_path: PathBuf,

    /// Match agenda sheet export (JSON list or {all_data})
    #[arg(long, env = "SHEET_PATH", default_value = "data/match_sheet.json")]
    pub sheet_path: PathBuf,

    /// Show sheet export, appended after the match sheet
    #[arg(long, env = "SHOWS_PATH")]
    pub shows_path: Option<PathBuf>,

    /// Results snapshot used to fill missing scores
    #[arg(long, env = "RESULTS_PATH")]
    pub results_path: Option<PathBuf>,

    /// Standings snapshot file
    #[arg(long, env = "STANDINGS_PATH")]
    pub standings_path: Option<PathBuf>,

    /// Standings JSON endpoint, used when no standings file is given
    #[arg(long, env = "STANDINGS_URL")]
    pub standings_url: Option<String>,

    /// Directory for the snapshot and all report files
    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Rows kept in the per-commentator tables
    #[arg(long, env = "TOP_LIMIT", default_value = "20")]
    pub top_limit: usize,

    /// Most recent training rows shown as predicted vs actual
    #[arg(long, env = "CALIBRATION_ROWS", default_value = "10")]
    pub calibration_rows: usize,

    /// Reference date (YYYY-MM-DD) splitting history from future matches
    #[arg(long, env = "TODAY")]
    pub today: Option<NaiveDate>,

    /// Optional xlsx workbook output path
    #[arg(long, env = "WORKBOOK")]
    pub workbook: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.subject_team.trim().is_empty() {
            anyhow::bail!("SUBJECT_TEAM must not be empty");
        }
        if self.top_limit == 0 {
            anyhow::bail!("top_limit must be at least 1");
        }
        Ok(())
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}
