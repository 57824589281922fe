use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::normalize::{extract_opponent, normalize_team_name, subject_on_left};
use crate::record::{EventRecord, Outcome, Score, VenueSide};
use crate::sources::{SourceRecord, StaffFields, parse_sheet_date};

pub type AudienceByDate = BTreeMap<NaiveDate, u32>;
pub type ResultsIndex = HashMap<(NaiveDate, String), Score>;
pub type Standings = HashMap<String, u32>;

/// Sheet marker for "no one assigned".
const NOT_APPLICABLE: &str = "n.v.t.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub input: usize,
    pub kept: usize,
    pub bad_date: usize,
    pub missing_label: usize,
    pub duplicates: usize,
    pub no_staff: usize,
    pub scores_filled: usize,
    pub outcomes_derived: usize,
    pub with_audience: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub records: Vec<EventRecord>,
    pub summary: MergeSummary,
}

/// Joins sheet metadata with per-date listener counts and optional results.
#[derive(Debug, Clone)]
pub struct Reconciler {
    subject_key: String,
}

impl Reconciler {
    pub fn new(subject_team: &str) -> Self {
        Self {
            subject_key: normalize_team_name(subject_team),
        }
    }

    pub fn subject_key(&self) -> &str {
        &self.subject_key
    }

    /// Produce the canonical record stream, sorted by date. The first row seen
    /// for a `(date, label)` pair wins; later copies are dropped. Malformed
    /// fields degrade to absent, never to an error.
    pub fn merge(
        &self,
        audience_by_date: &AudienceByDate,
        metadata: &[SourceRecord],
        results: &ResultsIndex,
    ) -> MergeOutput {
        let mut summary = MergeSummary {
            input: metadata.len(),
            ..MergeSummary::default()
        };
        let mut seen: HashSet<(NaiveDate, String)> = HashSet::new();
        let mut records = Vec::new();

        for source in metadata {
            let Some(date) = source
                .date_text
                .as_deref()
                .and_then(|raw| parse_sheet_date(raw, source.season_start_year))
            else {
                summary.bad_date += 1;
                continue;
            };
            let Some(label) = source
                .match_label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
            else {
                summary.missing_label += 1;
                continue;
            };
            if !seen.insert((date, label.to_string())) {
                summary.duplicates += 1;
                debug!(%date, label, "dropping duplicate match row");
                continue;
            }

            let staff = extract_staff(&source.staff);
            if staff.is_empty() {
                summary.no_staff += 1;
                continue;
            }

            let mut record = EventRecord::new(date, label);
            record.audience = audience_by_date.get(&date).copied();
            record.staff = staff;
            record.kickoff = clean_text(source.kickoff.as_deref());
            record.competition = clean_text(source.competition.as_deref());
            record.channel = clean_text(source.channel.as_deref());
            record.venue = source.venue.as_deref().and_then(VenueSide::parse);
            record.score = source.score.as_deref().and_then(Score::parse);
            record.outcome = source.result.as_deref().and_then(Outcome::parse);

            if record.score.is_none()
                && let Some(opponent) = extract_opponent(label, &self.subject_key)
                && let Some(score) = results.get(&(date, normalize_team_name(&opponent)))
            {
                record.score = Some(*score);
                summary.scores_filled += 1;
            }

            if record.outcome.is_none()
                && let Some(score) = record.score
            {
                record.outcome = derive_outcome(score, record.venue, label, &self.subject_key);
                if record.outcome.is_some() {
                    summary.outcomes_derived += 1;
                }
            }

            if record.audience.is_some() {
                summary.with_audience += 1;
            }
            records.push(record);
        }

        // Stable: rows sharing a date keep their input order.
        records.sort_by_key(|r| r.date);
        summary.kept = records.len();
        info!(
            input = summary.input,
            kept = summary.kept,
            duplicates = summary.duplicates,
            no_staff = summary.no_staff,
            bad_date = summary.bad_date,
            scores_filled = summary.scores_filled,
            "reconciled match records"
        );
        MergeOutput { records, summary }
    }

    /// Fill the derived opponent and its league position. Unresolved labels
    /// leave both absent.
    pub fn attach_opponents(&self, records: &mut [EventRecord], standings: &Standings) {
        for record in records.iter_mut() {
            record.opponent = extract_opponent(&record.match_label, &self.subject_key);
            record.opponent_rank = record
                .opponent
                .as_deref()
                .and_then(|opp| standings.get(&normalize_team_name(opp)).copied());
        }
    }
}

/// Win/draw/loss from the subject team's perspective. The venue decides which
/// number is "own"; without it, the subject's side in the label does.
pub fn derive_outcome(
    score: Score,
    venue: Option<VenueSide>,
    label: &str,
    subject_key: &str,
) -> Option<Outcome> {
    let own_is_home = match venue {
        Some(VenueSide::Home) => true,
        Some(VenueSide::Away) => false,
        None => subject_on_left(label, subject_key)?,
    };
    let (own, other) = if own_is_home {
        (score.home, score.away)
    } else {
        (score.away, score.home)
    };
    Some(Outcome::from_goals(own, other))
}

/// Names from the named fields first; the combined "A & B" cell only when
/// those are all empty. Sentinels and blanks are dropped, first-seen order kept.
pub fn extract_staff(fields: &StaffFields) -> Vec<String> {
    let mut names: Vec<String> = fields
        .named
        .iter()
        .flatten()
        .filter_map(|name| clean_name(name))
        .collect();

    if names.is_empty()
        && let Some(combined) = fields.combined.as_deref()
    {
        names.extend(combined.split(" & ").filter_map(clean_name));
    }

    let mut seen = HashSet::new();
    names.retain(|name| seen.insert(name.clone()));
    names
}

fn clean_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_APPLICABLE) {
        return None;
    }
    Some(repair_mojibake(trimmed))
}

/// Latin-1 decoded UTF-8 shows up in sheet exports ("CornÃ©"). Two-byte
/// sequences go first; a bare `Ã` left over is read as `à`.
fn repair_mojibake(raw: &str) -> String {
    raw.replace("Ã©", "é")
        .replace("Ã¨", "è")
        .replace("Ã«", "ë")
        .replace('Ã', "à")
}

fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
