use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::categories::{ChannelCategory, TimeBlock, weekday_label};
use crate::features::FeatureSchema;
use crate::record::EventRecord;
use crate::regression::{self, LinearModel, to_headcount};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStatus {
    Fitted { rows: usize, features: usize },
    Infeasible { reason: String },
    /// No training rows at all; nothing can be predicted.
    NoModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    Regression,
    BlockAverage,
    OverallAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuturePrediction {
    pub date: NaiveDate,
    pub match_label: String,
    pub weekday: String,
    pub kickoff: Option<String>,
    pub staff: Vec<String>,
    pub venue: Option<String>,
    pub channel_category: Option<String>,
    pub opponent_rank: Option<u32>,
    pub predicted_audience: Option<u32>,
    pub method: Option<PredictionMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationPair {
    pub date: NaiveDate,
    pub match_label: String,
    pub actual: u32,
    pub predicted: u32,
    pub method: PredictionMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub today: NaiveDate,
    pub status: ModelStatus,
    pub training_rows: usize,
    /// Column labels and weights; empty unless the model was fitted.
    pub features: Vec<String>,
    pub weights: Vec<f64>,
    pub future: Vec<FuturePrediction>,
    pub recent: Vec<CalibrationPair>,
}

/// Historical mean per kickoff band, then the overall mean. Means are kept
/// unrounded; only the final headcount is rounded.
#[derive(Debug, Clone, Default)]
pub struct FallbackPredictor {
    block_means: HashMap<TimeBlock, f64>,
    overall_mean: Option<f64>,
}

impl FallbackPredictor {
    pub fn fit(training: &[EventRecord]) -> Self {
        let mut block_sums: HashMap<TimeBlock, (f64, usize)> = HashMap::new();
        let mut total = 0.0;
        let mut count = 0usize;
        for record in training {
            let Some(value) = record.audience_value() else {
                continue;
            };
            total += value;
            count += 1;
            if let Some(block) = TimeBlock::of(record) {
                let entry = block_sums.entry(block).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        let block_means = block_sums
            .into_iter()
            .map(|(block, (sum, n))| (block, sum / n as f64))
            .collect();
        let overall_mean = (count > 0).then(|| total / count as f64);
        Self {
            block_means,
            overall_mean,
        }
    }

    pub fn predict(&self, record: &EventRecord) -> Option<(u32, PredictionMethod)> {
        if let Some(block) = TimeBlock::of(record)
            && let Some(mean) = self.block_means.get(&block)
        {
            return Some((to_headcount(*mean), PredictionMethod::BlockAverage));
        }
        self.overall_mean
            .map(|mean| (to_headcount(mean), PredictionMethod::OverallAverage))
    }
}

/// One fit-and-predict episode relative to a reference date.
#[derive(Debug, Clone)]
pub struct Predictor {
    today: NaiveDate,
    calibration_rows: usize,
}

struct Fitted {
    schema: FeatureSchema,
    model: Option<LinearModel>,
    fallback: FallbackPredictor,
}

impl Fitted {
    fn predict(&self, record: &EventRecord) -> Option<(u32, PredictionMethod)> {
        if let Some(model) = &self.model
            && let Ok(count) = model.predict_headcount(&self.schema.encode(record))
        {
            return Some((count, PredictionMethod::Regression));
        }
        self.fallback.predict(record)
    }
}

impl Predictor {
    pub fn new(today: NaiveDate, calibration_rows: usize) -> Self {
        Self {
            today,
            calibration_rows,
        }
    }

    /// Training rows have a known audience and a date before `today`; every
    /// record on or after `today` is predicted. Infeasibility is reported in
    /// the status and never fails the run.
    pub fn run(&self, records: &[EventRecord]) -> PredictionReport {
        let mut training: Vec<EventRecord> = records
            .iter()
            .filter(|r| r.audience.is_some() && r.date < self.today)
            .cloned()
            .collect();
        training.sort_by_key(|r| r.date);
        let future: Vec<&EventRecord> = records.iter().filter(|r| r.date >= self.today).collect();

        if training.is_empty() {
            warn!(future = future.len(), "no training rows, predictions unavailable");
            return PredictionReport {
                today: self.today,
                status: ModelStatus::NoModel,
                training_rows: 0,
                features: Vec::new(),
                weights: Vec::new(),
                future: future.into_iter().map(|r| future_row(r, None)).collect(),
                recent: Vec::new(),
            };
        }

        let schema = FeatureSchema::fit(&training);
        let x: Vec<Vec<f64>> = training.iter().map(|r| schema.encode(r)).collect();
        let y: Vec<f64> = training.iter().filter_map(EventRecord::audience_value).collect();

        let (status, model) = match regression::fit(&x, &y) {
            Ok(model) => (
                ModelStatus::Fitted {
                    rows: x.len(),
                    features: schema.width(),
                },
                Some(model),
            ),
            Err(err) => {
                warn!(error = %err, "regression infeasible, using historical averages");
                (
                    ModelStatus::Infeasible {
                        reason: err.to_string(),
                    },
                    None,
                )
            }
        };

        let (features, weights) = match &model {
            Some(model) => (schema.feature_names(), model.weights().to_vec()),
            None => (Vec::new(), Vec::new()),
        };
        let fitted = Fitted {
            schema,
            model,
            fallback: FallbackPredictor::fit(&training),
        };

        let future: Vec<FuturePrediction> = future
            .into_iter()
            .map(|r| future_row(r, fitted.predict(r)))
            .collect();

        let start = training.len().saturating_sub(self.calibration_rows);
        let recent: Vec<CalibrationPair> = training[start..]
            .iter()
            .filter_map(|r| {
                let actual = r.audience?;
                let (predicted, method) = fitted.predict(r)?;
                Some(CalibrationPair {
                    date: r.date,
                    match_label: r.match_label.clone(),
                    actual,
                    predicted,
                    method,
                })
            })
            .collect();

        info!(
            training = training.len(),
            future = future.len(),
            status = ?status,
            "prediction run finished"
        );
        PredictionReport {
            today: self.today,
            status,
            training_rows: training.len(),
            features,
            weights,
            future,
            recent,
        }
    }
}

fn future_row(
    record: &EventRecord,
    prediction: Option<(u32, PredictionMethod)>,
) -> FuturePrediction {
    FuturePrediction {
        date: record.date,
        match_label: record.match_label.clone(),
        weekday: weekday_label(record).to_string(),
        kickoff: record.kickoff.clone(),
        staff: record.staff.clone(),
        venue: record.venue.map(|v| v.label().to_string()),
        channel_category: ChannelCategory::of(record).map(|c| c.label().to_string()),
        opponent_rank: record.opponent_rank,
        predicted_audience: prediction.map(|(count, _)| count),
        method: prediction.map(|(_, method)| method),
    }
}
