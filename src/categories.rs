use serde::{Deserialize, Serialize};

use crate::record::{EventRecord, weekday_name};

/// Sentinel category for values missing from a record or from a fitted schema.
pub const UNKNOWN: &str = "Unknown";

pub const WEEKDAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeBlock {
    Midday,
    Afternoon,
    EarlyEvening,
    Evening,
    Late,
}

impl TimeBlock {
    /// Half-open bands over minutes since midnight. Anything before noon has no band.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            720..900 => Some(Self::Midday),
            900..1080 => Some(Self::Afternoon),
            1080..1200 => Some(Self::EarlyEvening),
            1200..1260 => Some(Self::Evening),
            1260.. => Some(Self::Late),
            _ => None,
        }
    }

    pub fn of(record: &EventRecord) -> Option<Self> {
        record.kickoff_minutes().and_then(Self::from_minutes)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Midday => "12:00-14:59",
            Self::Afternoon => "15:00-17:59",
            Self::EarlyEvening => "18:00-19:59",
            Self::Evening => "20:00-20:59",
            Self::Late => "21:00+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelCategory {
    HalfOpen,
    Open,
    Paid,
}

const HALF_OPEN_MARKER: &str = "ZIGGO";
const OPEN_MARKER: &str = "ESPN";

impl ChannelCategory {
    pub fn classify(channel: &str) -> Option<Self> {
        let upper = channel.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if upper.contains(HALF_OPEN_MARKER) {
            return Some(Self::HalfOpen);
        }
        if upper.starts_with(OPEN_MARKER) {
            let compact: String = upper.chars().filter(|ch| !ch.is_whitespace()).collect();
            if compact == OPEN_MARKER || compact == format!("{OPEN_MARKER}1") {
                return Some(Self::Open);
            }
        }
        Some(Self::Paid)
    }

    pub fn of(record: &EventRecord) -> Option<Self> {
        record.channel.as_deref().and_then(Self::classify)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HalfOpen => "Half-open",
            Self::Open => "Open",
            Self::Paid => "Paid",
        }
    }
}

pub fn weekday_label(record: &EventRecord) -> &'static str {
    weekday_name(record.weekday())
}

/// Position in the Monday-first week; names outside it sort last.
pub fn weekday_rank(name: &str) -> usize {
    WEEKDAY_ORDER
        .iter()
        .position(|day| *day == name)
        .unwrap_or(99)
}

/// Unordered pair key "A & B" with names sorted, for exactly two names.
pub fn duo_key(staff: &[String]) -> Option<String> {
    if staff.len() != 2 {
        return None;
    }
    let mut pair = [staff[0].as_str(), staff[1].as_str()];
    pair.sort_unstable();
    Some(format!("{} & {}", pair[0], pair[1]))
}

pub fn staff_pair_label(staff: &[String]) -> String {
    match staff.len() {
        0 => UNKNOWN.to_string(),
        1 => format!("Solo: {}", staff[0]),
        2 => duo_key(staff).unwrap_or_else(|| UNKNOWN.to_string()),
        _ => "Multi".to_string(),
    }
}
