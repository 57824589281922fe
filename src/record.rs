use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One canonical broadcast after reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub kickoff: Option<String>,
    pub match_label: String,
    /// `None` means the count is unknown, which is not the same as zero listeners.
    #[serde(default)]
    pub audience: Option<u32>,
    #[serde(default)]
    pub staff: Vec<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub venue: Option<VenueSide>,
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub opponent_rank: Option<u32>,
}

impl EventRecord {
    pub fn new(date: NaiveDate, match_label: impl Into<String>) -> Self {
        Self {
            date,
            kickoff: None,
            match_label: match_label.into(),
            audience: None,
            staff: Vec::new(),
            channel: None,
            venue: None,
            score: None,
            outcome: None,
            competition: None,
            opponent: None,
            opponent_rank: None,
        }
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn kickoff_minutes(&self) -> Option<u32> {
        self.kickoff.as_deref().and_then(parse_kickoff)
    }

    pub fn audience_value(&self) -> Option<f64> {
        self.audience.map(f64::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VenueSide {
    Home,
    Away,
}

impl VenueSide {
    /// Accepts the Dutch sheet spellings as well as English ones.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "thuis" | "home" => Some(Self::Home),
            "uit" | "away" => Some(Self::Away),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Away => "Away",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
}

impl Outcome {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "W" => Some(Self::Win),
            "D" => Some(Self::Draw),
            "L" => Some(Self::Loss),
            _ => None,
        }
    }

    pub fn from_goals(own: u32, other: u32) -> Self {
        if own > other {
            Self::Win
        } else if own < other {
            Self::Loss
        } else {
            Self::Draw
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Win => "W",
            Self::Draw => "D",
            Self::Loss => "L",
        }
    }
}

/// Final score as written in the match label order: first number belongs to the home side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Error)]
#[error("invalid score {0:?}")]
pub struct InvalidScore(String);

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Sheets mix hyphens, en/em dashes and mangled encodings; every non-digit
    /// glyph is treated as a separator and exactly two numbers must remain.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .trim()
            .chars()
            .map(|ch| if ch.is_ascii_digit() { ch } else { '-' })
            .collect();
        let mut parts = cleaned.split('-').filter(|part| !part.is_empty());
        let home = parts.next()?.parse::<u32>().ok()?;
        let away = parts.next()?.parse::<u32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { home, away })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

impl From<Score> for String {
    fn from(score: Score) -> Self {
        score.to_string()
    }
}

impl TryFrom<String> for Score {
    type Error = InvalidScore;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Score::parse(&raw).ok_or(InvalidScore(raw))
    }
}

/// `HH:MM` to minutes since midnight. Values outside a 24-hour clock are absent.
pub fn parse_kickoff(raw: &str) -> Option<u32> {
    let mut parts = raw.trim().split(':');
    let hours = parts.next()?.trim().parse::<u32>().ok()?;
    let minutes = parts.next()?.trim().parse::<u32>().ok()?;
    if parts.next().is_some() || hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
