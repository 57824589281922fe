use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{
    AggregateTable, audience, aggregate, by_key_asc, by_mean_desc, by_rank, full_credit, single,
    split_credit,
};
use crate::categories::{ChannelCategory, TimeBlock, duo_key, weekday_label, weekday_rank};
use crate::record::EventRecord;

/// Default number of games listed per season.
pub const TOP_GAMES_PER_SEASON: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    CommentatorsFullCredit,
    CommentatorsSplitCredit,
    CommentatorDuos,
    KickoffExact,
    KickoffBlocks,
    Weekday,
    ByResult,
    ByHomeAway,
    ByTvCategory,
}

impl ViewKind {
    pub const ALL: [ViewKind; 9] = [
        ViewKind::CommentatorsFullCredit,
        ViewKind::CommentatorsSplitCredit,
        ViewKind::CommentatorDuos,
        ViewKind::KickoffExact,
        ViewKind::KickoffBlocks,
        ViewKind::Weekday,
        ViewKind::ByResult,
        ViewKind::ByHomeAway,
        ViewKind::ByTvCategory,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            ViewKind::CommentatorsFullCredit => "commentators_full_credit",
            ViewKind::CommentatorsSplitCredit => "commentators_split_credit",
            ViewKind::CommentatorDuos => "commentator_duos",
            ViewKind::KickoffExact => "kickoff_exact",
            ViewKind::KickoffBlocks => "kickoff_blocks",
            ViewKind::Weekday => "weekday",
            ViewKind::ByResult => "by_result",
            ViewKind::ByHomeAway => "by_home_away",
            ViewKind::ByTvCategory => "by_tv_category",
        }
    }

    pub fn compute(self, records: &[EventRecord], top_limit: usize) -> AggregateTable {
        let name = self.table_name();
        let staff = |r: &EventRecord| r.staff.clone();
        match self {
            ViewKind::CommentatorsFullCredit => {
                let agg = aggregate(
                    records,
                    full_credit(staff),
                    audience,
                    by_mean_desc,
                    Some(top_limit),
                );
                AggregateTable::from_aggregation(name, agg, String::clone)
            }
            ViewKind::CommentatorsSplitCredit => {
                let agg = aggregate(
                    records,
                    split_credit(staff),
                    audience,
                    by_mean_desc,
                    Some(top_limit),
                );
                AggregateTable::from_aggregation(name, agg, String::clone)
            }
            ViewKind::CommentatorDuos => {
                let agg = aggregate(
                    records,
                    single(|r: &EventRecord| duo_key(&r.staff)),
                    audience,
                    by_mean_desc,
                    None,
                );
                AggregateTable::from_aggregation(name, agg, String::clone)
            }
            ViewKind::KickoffExact => {
                let agg = aggregate(
                    records,
                    single(|r: &EventRecord| r.kickoff.clone()),
                    audience,
                    by_key_asc,
                    None,
                );
                AggregateTable::from_aggregation(name, agg, String::clone)
            }
            ViewKind::KickoffBlocks => {
                let agg = aggregate(records, single(TimeBlock::of), audience, by_mean_desc, None);
                AggregateTable::from_aggregation(name, agg, |b| b.label().to_string())
            }
            ViewKind::Weekday => {
                let agg = aggregate(
                    records,
                    single(|r: &EventRecord| Some(weekday_label(r).to_string())),
                    audience,
                    by_rank(|day: &String| weekday_rank(day)),
                    None,
                );
                AggregateTable::from_aggregation(name, agg, String::clone)
            }
            ViewKind::ByResult => {
                let agg = aggregate(
                    records,
                    single(|r: &EventRecord| r.outcome),
                    audience,
                    by_key_asc,
                    None,
                );
                AggregateTable::from_aggregation(name, agg, |o| o.code().to_string())
            }
            ViewKind::ByHomeAway => {
                let agg = aggregate(
                    records,
                    single(|r: &EventRecord| r.venue),
                    audience,
                    by_key_asc,
                    None,
                );
                AggregateTable::from_aggregation(name, agg, |v| v.label().to_string())
            }
            ViewKind::ByTvCategory => {
                let agg = aggregate(
                    records,
                    single(ChannelCategory::of),
                    audience,
                    by_key_asc,
                    None,
                );
                AggregateTable::from_aggregation(name, agg, |c| c.label().to_string())
            }
        }
    }
}

/// All views over the same read-only record slice, in catalogue order.
pub fn compute_views(records: &[EventRecord], top_limit: usize) -> Vec<AggregateTable> {
    ViewKind::ALL
        .par_iter()
        .map(|kind| kind.compute(records, top_limit))
        .collect()
}

/// Flat overview row for listings and exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRow {
    pub date: NaiveDate,
    pub weekday: String,
    pub kickoff: Option<String>,
    pub match_label: String,
    pub staff: String,
    pub audience: Option<u32>,
    pub competition: Option<String>,
    pub channel: Option<String>,
    pub score: Option<String>,
    pub result: Option<String>,
    pub venue: Option<String>,
    pub opponent: Option<String>,
    pub opponent_rank: Option<u32>,
}

impl MatchRow {
    pub fn from_record(record: &EventRecord) -> Self {
        let staff = if record.staff.is_empty() {
            "N/A".to_string()
        } else {
            record.staff.join(" & ")
        };
        Self {
            date: record.date,
            weekday: weekday_label(record).to_string(),
            kickoff: record.kickoff.clone(),
            match_label: record.match_label.clone(),
            staff,
            audience: record.audience,
            competition: record.competition.clone(),
            channel: record.channel.clone(),
            score: record.score.map(|s| s.to_string()),
            result: record.outcome.map(|o| o.code().to_string()),
            venue: record.venue.map(|v| v.label().to_string()),
            opponent: record.opponent.clone(),
            opponent_rank: record.opponent_rank,
        }
    }
}

/// Newest first.
pub fn all_matches(records: &[EventRecord]) -> Vec<MatchRow> {
    let mut rows: Vec<MatchRow> = records.iter().map(MatchRow::from_record).collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows
}

/// Seasons run from 1 July to 30 June: "2024/2025".
pub fn season_label(date: NaiveDate) -> String {
    let start = if date.month() >= 7 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}/{}", start, start + 1)
}

pub fn top_games(records: &[EventRecord], season: &str, n: usize) -> Vec<MatchRow> {
    let mut in_season: Vec<&EventRecord> = records
        .iter()
        .filter(|r| r.audience.is_some() && season_label(r.date) == season)
        .collect();
    in_season.sort_by(|a, b| b.audience.cmp(&a.audience));
    in_season.into_iter().take(n).map(MatchRow::from_record).collect()
}

/// Top games for every season that has at least one counted record.
pub fn top_games_by_season(records: &[EventRecord], n: usize) -> BTreeMap<String, Vec<MatchRow>> {
    let mut seasons: Vec<String> = records
        .iter()
        .filter(|r| r.audience.is_some())
        .map(|r| season_label(r.date))
        .collect();
    seasons.sort();
    seasons.dedup();
    seasons
        .into_iter()
        .map(|season| {
            let games = top_games(records, &season, n);
            (season, games)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub excluded_null_listeners: usize,
    pub included: usize,
}

impl RunSummary {
    pub fn of(records: &[EventRecord]) -> Self {
        let included = records.iter().filter(|r| r.audience.is_some()).count();
        Self {
            total: records.len(),
            excluded_null_listeners: records.len() - included,
            included,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Outcome, VenueSide};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<EventRecord> {
        let mut a = EventRecord::new(ymd(2024, 8, 3), "Ajax - PSV");
        a.audience = Some(100);
        a.staff = vec!["Kees".into(), "Anna".into()];
        a.kickoff = Some("18:45".into());
        a.channel = Some("ESPN".into());
        a.venue = Some(VenueSide::Home);
        a.outcome = Some(Outcome::Win);

        let mut b = EventRecord::new(ymd(2024, 8, 11), "AZ - Ajax");
        b.audience = Some(60);
        b.staff = vec!["Kees".into()];
        b.kickoff = Some("14:30".into());
        b.channel = Some("Ziggo Sport".into());
        b.venue = Some(VenueSide::Away);
        b.outcome = Some(Outcome::Loss);

        let mut c = EventRecord::new(ymd(2025, 1, 19), "Ajax - NEC");
        c.staff = vec!["Anna".into(), "Kees".into(), "Wim".into()];
        c.kickoff = Some("10:00".into());

        vec![a, b, c]
    }

    #[test]
    fn catalogue_is_complete_and_ordered() {
        let tables = compute_views(&sample(), 20);
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let expected: Vec<&str> = ViewKind::ALL.iter().map(|k| k.table_name()).collect();
        assert_eq!(names, expected);
        for table in &tables {
            assert_eq!(table.excluded_null_listeners, 1, "{}", table.name);
        }
    }

    #[test]
    fn duo_view_only_takes_pairs() {
        let table = ViewKind::CommentatorDuos.compute(&sample(), 20);
        assert_eq!(table.buckets.len(), 1);
        assert_eq!(table.buckets[0].key, "Anna & Kees");
        assert_eq!(table.buckets[0].matches_count, 1);
    }

    #[test]
    fn full_credit_counts_every_member() {
        let table = ViewKind::CommentatorsFullCredit.compute(&sample(), 20);
        let kees = table.buckets.iter().find(|b| b.key == "Kees").unwrap();
        assert_eq!(kees.matches_count, 2);
        assert_eq!(kees.avg, 80.0);
        assert_eq!(table.buckets[0].key, "Anna");
    }

    #[test]
    fn enum_views_use_fixed_order() {
        let records = sample();
        let result = ViewKind::ByResult.compute(&records, 20);
        let keys: Vec<&str> = result.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["W", "L"]);

        let venue = ViewKind::ByHomeAway.compute(&records, 20);
        let keys: Vec<&str> = venue.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Home", "Away"]);

        let tv = ViewKind::ByTvCategory.compute(&records, 20);
        let keys: Vec<&str> = tv.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Half-open", "Open"]);

        let days = ViewKind::Weekday.compute(&records, 20);
        let keys: Vec<&str> = days.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Saturday", "Sunday"]);
    }

    #[test]
    fn out_of_range_kickoff_lands_in_no_block() {
        let mut records = sample();
        records[1].kickoff = Some("99999999:00".into());
        let tables = compute_views(&records, 20);
        let blocks = tables.iter().find(|t| t.name == "kickoff_blocks").unwrap();
        let keys: Vec<&str> = blocks.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["18:00-19:59"]);
        assert_eq!(blocks.included, 1);

        let exact = tables.iter().find(|t| t.name == "kickoff_exact").unwrap();
        let keys: Vec<&str> = exact.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["18:45", "99999999:00"]);
    }

    #[test]
    fn kickoff_blocks_sorted_by_mean() {
        let table = ViewKind::KickoffBlocks.compute(&sample(), 20);
        let keys: Vec<&str> = table.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["18:00-19:59", "12:00-14:59"]);
    }

    #[test]
    fn seasons_split_on_first_of_july() {
        assert_eq!(season_label(ymd(2024, 7, 1)), "2024/2025");
        assert_eq!(season_label(ymd(2025, 6, 30)), "2024/2025");
        assert_eq!(season_label(ymd(2024, 6, 30)), "2023/2024");
    }

    #[test]
    fn top_games_skip_unknown_audience() {
        let records = sample();
        let top = top_games(&records, "2024/2025", 5);
        let labels: Vec<&str> = top.iter().map(|r| r.match_label.as_str()).collect();
        assert_eq!(labels, vec!["Ajax - PSV", "AZ - Ajax"]);
        assert_eq!(top_games(&records, "2024/2025", 1).len(), 1);
        assert!(top_games(&records, "2023/2024", 5).is_empty());
        assert_eq!(top_games_by_season(&records, 5).len(), 1);
    }

    #[test]
    fn listings_are_newest_first() {
        let rows = all_matches(&sample());
        assert_eq!(rows[0].date, ymd(2025, 1, 19));
        assert_eq!(rows[0].staff, "Anna & Kees & Wim");
        assert_eq!(rows[2].result.as_deref(), Some("W"));
        assert_eq!(
            RunSummary::of(&sample()),
            RunSummary {
                total: 3,
                excluded_null_listeners: 1,
                included: 2
            }
        );
    }
}
