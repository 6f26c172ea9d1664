//! Model training
//!
//! The sample table is split by time (leading rows train, trailing rows
//! test), class weights are balanced on the training partition, and a
//! seeded random forest is fitted. The result is an immutable
//! [`TrainedModel`].

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::ensemble::{ForestParams, RandomForest};
use super::features::{EngineeredSample, FeatureBuilder, FeatureSchema, SampleTable};
use super::metrics::EvaluationReport;
use crate::config::TrainingConfig;
use crate::data::ObservationSeries;
use crate::error::{CrisisError, Result};

/// Fitted forest plus everything needed to apply it consistently
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub(crate) schema: FeatureSchema,
    pub(crate) forest: RandomForest,
    pub(crate) decision_threshold: f64,
    pub(crate) class_weights: [f64; 2],
    pub(crate) summary: SplitSummary,
}

impl TrainedModel {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn feature_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    /// Weights applied to (stable, crisis) rows during fitting
    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    pub fn split_summary(&self) -> &SplitSummary {
        &self.summary
    }
}

/// Shape of the chronological split a model was trained with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_positive_rate: f64,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    /// First test date, when a test partition exists
    pub test_start: Option<NaiveDate>,
}

/// Output of one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    /// Held-out report; `None` when the test partition is empty
    pub report: Option<EvaluationReport>,
}

/// Number of leading rows that go to training: the trailing
/// `ceil(test_fraction * n)` rows are held out
pub fn chronological_split(n: usize, test_fraction: f64) -> usize {
    let n_test = (test_fraction * n as f64).ceil() as usize;
    n.saturating_sub(n_test.min(n))
}

/// Balanced class weights: `n / (2 * count_c)`
fn balanced_weights(labels: &[u8]) -> [f64; 2] {
    let n = labels.len() as f64;
    let positives = labels.iter().filter(|&&l| l == 1).count() as f64;
    let negatives = n - positives;
    [n / (2.0 * negatives), n / (2.0 * positives)]
}

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Build samples from `series` and fit on them
    pub fn train(&self, series: &ObservationSeries) -> Result<TrainingOutcome> {
        let table = FeatureBuilder::from_config(&self.config).build(series)?;
        self.fit(&table)
    }

    /// Fit on an already-built sample table
    pub fn fit(&self, table: &SampleTable) -> Result<TrainingOutcome> {
        let samples = table.samples();
        let n_train = chronological_split(samples.len(), self.config.test_fraction);
        if n_train == 0 {
            return Err(CrisisError::InsufficientHistory {
                required: 1,
                actual: 0,
            });
        }
        let (train, test) = samples.split_at(n_train);

        let y: Vec<u8> = train.iter().map(|s| s.label).collect();
        let positives = y.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(CrisisError::DegenerateTrainingSet {
                label: y[0],
                rows: y.len(),
            });
        }
        let x: Vec<Vec<f64>> = train.iter().map(|s| s.features.clone()).collect();
        let class_weights = balanced_weights(&y);

        info!(
            "Training on {} rows ({} -> {}), testing on {}; crisis rate {:.1}%, class weights [{:.3}, {:.3}]",
            train.len(),
            train[0].date,
            train[train.len() - 1].date,
            test.len(),
            positives as f64 * 100.0 / y.len() as f64,
            class_weights[0],
            class_weights[1]
        );

        let forest = RandomForest::fit(
            &x,
            &y,
            class_weights,
            ForestParams {
                n_trees: self.config.ensemble_size,
                max_depth: self.config.max_depth,
                max_features: None,
                seed: self.config.random_seed,
            },
        );

        let summary = SplitSummary {
            train_rows: train.len(),
            test_rows: test.len(),
            train_positive_rate: positives as f64 / y.len() as f64,
            train_start: train[0].date,
            train_end: train[train.len() - 1].date,
            test_start: test.first().map(|s| s.date),
        };

        let model = TrainedModel {
            schema: table.schema().clone(),
            forest,
            decision_threshold: self.config.decision_threshold,
            class_weights,
            summary,
        };

        let report = if test.is_empty() {
            None
        } else {
            Some(evaluate(&model, test))
        };
        if let Some(r) = &report {
            info!(
                "Held-out accuracy {:.3}, crisis precision {:.3} recall {:.3}",
                r.accuracy, r.crisis.precision, r.crisis.recall
            );
        }

        Ok(TrainingOutcome { model, report })
    }
}

/// Score `model` on labeled samples
pub fn evaluate(model: &TrainedModel, samples: &[EngineeredSample]) -> EvaluationReport {
    let actual: Vec<u8> = samples.iter().map(|s| s.label).collect();
    let predicted: Vec<u8> = samples
        .iter()
        .map(|s| u8::from(model.classify(&s.features).decision.is_warning()))
        .collect();
    EvaluationReport::from_labels(&actual, &predicted)
}
