use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::EventRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketStats<K> {
    pub key: K,
    pub count: usize,
    pub min: f64,
    pub mean: f64,
    pub median: f64,
    pub max: f64,
}

impl<K> BucketStats<K> {
    /// `None` for an empty bucket; callers never see one.
    fn from_values(key: K, values: &mut [f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let sum: f64 = values.iter().sum();
        let median = if count % 2 == 1 {
            values[count / 2]
        } else {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        };
        Some(Self {
            key,
            count,
            min: values[0],
            mean: round2(sum / count as f64),
            median,
            max: values[count - 1],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation<K> {
    pub buckets: Vec<BucketStats<K>>,
    /// Records skipped because the metric was absent.
    pub excluded: usize,
    /// Records that contributed to at least one bucket.
    pub included: usize,
}

/// Partition `records` with `bucket`, fold `metric` per bucket, then order
/// and truncate. The bucket function receives the record's metric value and
/// returns `(key, contribution)` pairs, so one record may land in several
/// buckets (staff lists) or none (no kickoff band).
pub fn aggregate<K, B, M, O>(
    records: &[EventRecord],
    bucket: B,
    metric: M,
    order: O,
    limit: Option<usize>,
) -> Aggregation<K>
where
    K: Ord + Clone,
    B: Fn(&EventRecord, f64) -> Vec<(K, f64)>,
    M: Fn(&EventRecord) -> Option<f64>,
    O: Fn(&BucketStats<K>, &BucketStats<K>) -> Ordering,
{
    let mut acc: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    let mut excluded = 0;
    let mut included = 0;

    for record in records {
        let Some(value) = metric(record) else {
            excluded += 1;
            continue;
        };
        let entries = bucket(record, value);
        if entries.is_empty() {
            continue;
        }
        included += 1;
        for (key, contribution) in entries {
            acc.entry(key).or_default().push(contribution);
        }
    }

    let mut buckets: Vec<BucketStats<K>> = acc
        .into_iter()
        .filter_map(|(key, mut values)| BucketStats::from_values(key, &mut values))
        .collect();
    // Stable sort over key-ordered input: ties stay in key order.
    buckets.sort_by(|a, b| order(a, b));
    if let Some(limit) = limit {
        buckets.truncate(limit);
    }

    Aggregation {
        buckets,
        excluded,
        included,
    }
}

/// Audience size as the metric; absent counts are excluded.
pub fn audience(record: &EventRecord) -> Option<f64> {
    record.audience_value()
}

/// Bucket function for a single optional key.
pub fn single<K, F>(key: F) -> impl Fn(&EventRecord, f64) -> Vec<(K, f64)>
where
    F: Fn(&EventRecord) -> Option<K>,
{
    move |record, value| key(record).map(|k| vec![(k, value)]).unwrap_or_default()
}

/// Every member of the multi-valued key gets the full value.
pub fn full_credit<F>(members: F) -> impl Fn(&EventRecord, f64) -> Vec<(String, f64)>
where
    F: Fn(&EventRecord) -> Vec<String>,
{
    move |record, value| members(record).into_iter().map(|m| (m, value)).collect()
}

/// The value is divided evenly across members.
pub fn split_credit<F>(members: F) -> impl Fn(&EventRecord, f64) -> Vec<(String, f64)>
where
    F: Fn(&EventRecord) -> Vec<String>,
{
    move |record, value| {
        let members = members(record);
        if members.is_empty() {
            return Vec::new();
        }
        let share = value / members.len() as f64;
        members.into_iter().map(|m| (m, share)).collect()
    }
}

/// Highest mean first; equal means fall back to the key.
pub fn by_mean_desc<K: Ord>(a: &BucketStats<K>, b: &BucketStats<K>) -> Ordering {
    b.mean.total_cmp(&a.mean).then_with(|| a.key.cmp(&b.key))
}

pub fn by_key_asc<K: Ord>(a: &BucketStats<K>, b: &BucketStats<K>) -> Ordering {
    a.key.cmp(&b.key)
}

/// Rank-based ordering for keys with a fixed presentation order.
pub fn by_rank<K, R>(rank: R) -> impl Fn(&BucketStats<K>, &BucketStats<K>) -> Ordering
where
    K: Ord,
    R: Fn(&K) -> usize,
{
    move |a, b| rank(&a.key).cmp(&rank(&b.key)).then_with(|| a.key.cmp(&b.key))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One aggregate as an output table. Keys are rendered to their display labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub name: String,
    pub excluded_null_listeners: usize,
    pub included: usize,
    pub buckets: Vec<BucketRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketRow {
    pub key: String,
    pub matches_count: usize,
    pub min: f64,
    pub avg: f64,
    pub median: f64,
    pub max: f64,
}

impl AggregateTable {
    pub fn from_aggregation<K>(
        name: &str,
        aggregation: Aggregation<K>,
        label: impl Fn(&K) -> String,
    ) -> Self {
        let buckets = aggregation
            .buckets
            .into_iter()
            .map(|stats| BucketRow {
                key: label(&stats.key),
                matches_count: stats.count,
                min: stats.min,
                avg: stats.mean,
                median: stats.median,
                max: stats.max,
            })
            .collect();
        Self {
            name: name.to_string(),
            excluded_null_listeners: aggregation.excluded,
            included: aggregation.included,
            buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(day: u32, audience: Option<u32>, staff: &[&str]) -> EventRecord {
        let mut r = EventRecord::new(NaiveDate::from_ymd_opt(2024, 9, day).unwrap(), "Ajax - PSV");
        r.audience = audience;
        r.staff = staff.iter().map(|s| s.to_string()).collect();
        r
    }

    fn staff(record: &EventRecord) -> Vec<String> {
        record.staff.clone()
    }

    #[test]
    fn stats_follow_median_and_rounding_rules() {
        let records = [
            rec(1, Some(10), &["A"]),
            rec(2, Some(20), &["A"]),
            rec(3, Some(31), &["A"]),
            rec(4, Some(40), &["A"]),
        ];
        let out = aggregate(&records, full_credit(staff), audience, by_mean_desc, None);
        let bucket = &out.buckets[0];
        assert_eq!(bucket.count, 4);
        assert_eq!(bucket.min, 10.0);
        assert_eq!(bucket.max, 40.0);
        assert!((bucket.median - 25.5).abs() < 1e-9);
        assert!((bucket.mean - 25.25).abs() < 1e-9);
    }

    #[test]
    fn mean_is_rounded_to_two_decimals() {
        let records = [rec(1, Some(1), &["A"]), rec(2, Some(1), &["A"]), rec(3, Some(2), &["A"])];
        let out = aggregate(&records, full_credit(staff), audience, by_mean_desc, None);
        assert_eq!(out.buckets[0].mean, 1.33);
    }

    #[test]
    fn missing_metric_is_excluded_not_zero() {
        let records = [rec(1, None, &["A"]), rec(2, Some(0), &["A"]), rec(3, Some(10), &["B"])];
        let out = aggregate(&records, full_credit(staff), audience, by_key_asc, None);
        assert_eq!(out.excluded, 1);
        assert_eq!(out.included, 2);
        assert_eq!(out.buckets[0].key, "A");
        assert_eq!(out.buckets[0].count, 1);
        assert_eq!(out.buckets[0].max, 0.0);
        assert_eq!(out.included + out.excluded, records.len());
    }

    #[test]
    fn split_credit_divides_evenly() {
        let records = [rec(1, Some(90), &["A", "B", "C"]), rec(2, Some(30), &["A"])];
        let out = aggregate(&records, split_credit(staff), audience, by_key_asc, None);
        let a = &out.buckets[0];
        assert_eq!(a.key, "A");
        assert_eq!(a.count, 2);
        assert_eq!(a.min, 30.0);
        assert_eq!(a.max, 30.0);
        assert_eq!(out.buckets[1].max, 30.0);
    }

    #[test]
    fn ordering_and_limit() {
        let records = [
            rec(1, Some(10), &["Low"]),
            rec(2, Some(50), &["High"]),
            rec(3, Some(30), &["Mid"]),
        ];
        let out = aggregate(&records, full_credit(staff), audience, by_mean_desc, Some(2));
        let keys: Vec<&str> = out.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["High", "Mid"]);
    }

    #[test]
    fn equal_means_keep_key_order() {
        let records = [rec(1, Some(10), &["B"]), rec(2, Some(10), &["A"])];
        let out = aggregate(&records, full_credit(staff), audience, by_mean_desc, None);
        let keys: Vec<&str> = out.buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn single_key_filter_drops_record_from_buckets() {
        let mut with_kickoff = rec(1, Some(10), &["A"]);
        with_kickoff.kickoff = Some("14:30".into());
        let records = [with_kickoff, rec(2, Some(20), &["A"])];
        let out = aggregate(
            &records,
            single(|r: &EventRecord| r.kickoff.clone()),
            audience,
            by_key_asc,
            None,
        );
        assert_eq!(out.buckets.len(), 1);
        assert_eq!(out.included, 1);
        assert_eq!(out.excluded, 0);
    }

    #[test]
    fn stats_bounds_hold() {
        let records: Vec<EventRecord> = (1..=20)
            .map(|d| rec(d, Some(d * 37 % 11), &["A", if d % 2 == 0 { "B" } else { "C" }]))
            .collect();
        let out = aggregate(&records, split_credit(staff), audience, by_mean_desc, None);
        for bucket in &out.buckets {
            assert!(bucket.min <= bucket.median && bucket.median <= bucket.max);
            assert!(bucket.min - 0.005 <= bucket.mean && bucket.mean <= bucket.max + 0.005);
        }
    }

    #[test]
    fn table_renders_labels() {
        let records = [rec(1, Some(10), &["A"]), rec(2, None, &["A"])];
        let out = aggregate(&records, full_credit(staff), audience, by_mean_desc, None);
        let table =
            AggregateTable::from_aggregation("commentators_full_credit", out, |k| k.clone());
        assert_eq!(table.excluded_null_listeners, 1);
        assert_eq!(table.buckets[0].key, "A");
        assert_eq!(table.buckets[0].avg, 10.0);
    }
}
