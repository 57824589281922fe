use std::collections::BTreeSet;

use serde::Serialize;

use crate::categories::{ChannelCategory, TimeBlock, UNKNOWN, staff_pair_label, weekday_label};
use crate::record::EventRecord;

/// Categorical dimensions in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dimension {
    TimeBlock,
    Weekday,
    Venue,
    ChannelCategory,
    StaffPair,
}

impl Dimension {
    pub const ORDER: [Dimension; 5] = [
        Dimension::TimeBlock,
        Dimension::Weekday,
        Dimension::Venue,
        Dimension::ChannelCategory,
        Dimension::StaffPair,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::TimeBlock => "time_block",
            Dimension::Weekday => "weekday",
            Dimension::Venue => "venue",
            Dimension::ChannelCategory => "channel_category",
            Dimension::StaffPair => "staff_pair",
        }
    }

    /// The record's category in this dimension; missing values map to `Unknown`.
    pub fn value_of(self, record: &EventRecord) -> String {
        let value = match self {
            Dimension::TimeBlock => TimeBlock::of(record).map(TimeBlock::label),
            Dimension::Weekday => Some(weekday_label(record)),
            Dimension::Venue => record.venue.map(|v| v.label()),
            Dimension::ChannelCategory => ChannelCategory::of(record).map(ChannelCategory::label),
            Dimension::StaffPair => return staff_pair_label(&record.staff),
        };
        value.unwrap_or(UNKNOWN).to_string()
    }
}

/// Known categories per dimension, fitted once from the training subset and
/// immutable afterwards so every encoding has the same width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSchema {
    blocks: Vec<(Dimension, Vec<String>)>,
}

impl FeatureSchema {
    pub fn fit(training: &[EventRecord]) -> Self {
        let blocks = Dimension::ORDER
            .iter()
            .map(|&dim| {
                let mut values: BTreeSet<String> =
                    training.iter().map(|r| dim.value_of(r)).collect();
                values.insert(UNKNOWN.to_string());
                (dim, values.into_iter().collect())
            })
            .collect();
        Self { blocks }
    }

    pub fn categories(&self, dim: Dimension) -> &[String] {
        self.blocks
            .iter()
            .find(|(d, _)| *d == dim)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Bias, opponent rank, then the one-hot blocks.
    pub fn width(&self) -> usize {
        2 + self.blocks.iter().map(|(_, values)| values.len()).sum::<usize>()
    }

    pub fn encode(&self, record: &EventRecord) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(record.opponent_rank.map(f64::from).unwrap_or(0.0));
        for (dim, values) in &self.blocks {
            let value = dim.value_of(record);
            let hit = if values.contains(&value) {
                value
            } else {
                UNKNOWN.to_string()
            };
            row.extend(values.iter().map(|v| if *v == hit { 1.0 } else { 0.0 }));
        }
        row
    }

    /// Column labels aligned with [`FeatureSchema::encode`].
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec!["bias".to_string(), "opponent_rank".to_string()];
        for (dim, values) in &self.blocks {
            names.extend(values.iter().map(|v| format!("{}={}", dim.name(), v)));
        }
        names
    }
}
