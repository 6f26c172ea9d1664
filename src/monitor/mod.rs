//! Live session behind the dashboard
//!
//! A [`Session`] owns the loaded indicator history and a slot holding the
//! current model. Retraining builds a complete new model off the async
//! runtime and swaps it into the slot in one step, so readers see either the
//! old model or the new one and never a partial state.

pub mod dashboard;

pub use dashboard::{create_router, start_dashboard};

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::analyst::{self, Commentary};
use crate::config::Config;
use crate::data::{Indicator, ObservationSeries};
use crate::error::{CrisisError, Result};
use crate::ml::{
    EvaluationReport, FeatureImportance, Prediction, SimulationInput, SplitSummary, TrainedModel,
    Trainer,
};

/// Model currently served, with its held-out report
#[derive(Debug, Clone)]
pub struct ModelSlot {
    pub model: Arc<TrainedModel>,
    pub report: Option<EvaluationReport>,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

/// Result of one simulated scenario
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReply {
    pub inputs: Vec<(String, f64)>,
    #[serde(flatten)]
    pub prediction: Prediction,
    pub commentary: Commentary,
    pub message: &'static str,
}

/// Trailing window of index closes and VIX for charting
#[derive(Debug, Clone, Serialize)]
pub struct RecentWindow {
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
    pub vix: Vec<f64>,
}

/// Training summary returned after a retrain
#[derive(Debug, Clone, Serialize)]
pub struct RetrainSummary {
    pub features: Vec<String>,
    pub n_trees: usize,
    pub split: SplitSummary,
    pub accuracy: Option<f64>,
}

pub struct Session {
    config: Config,
    series: RwLock<Arc<ObservationSeries>>,
    slot: RwLock<Option<ModelSlot>>,
}

impl Session {
    /// Session with an empty model slot
    pub fn new(config: Config, series: ObservationSeries) -> Self {
        Self {
            config,
            series: RwLock::new(Arc::new(series)),
            slot: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the indicator history; the current model keeps serving
    pub async fn replace_series(&self, series: ObservationSeries) {
        *self.series.write().await = Arc::new(series);
    }

    /// Fit a fresh model on the current history and swap it in.
    /// On failure the previous model stays in place.
    pub async fn retrain(&self) -> Result<RetrainSummary> {
        let series = self.series.read().await.clone();
        let trainer = Trainer::new(self.config.training.clone())?;

        let outcome = tokio::task::spawn_blocking(move || trainer.train(&series))
            .await
            .map_err(|e| CrisisError::Data(format!("training task failed: {}", e)))?
            .inspect_err(|e| warn!("Retrain failed, keeping previous model: {}", e))?;

        let summary = RetrainSummary {
            features: outcome.model.feature_names().to_vec(),
            n_trees: outcome.model.n_trees(),
            split: outcome.model.split_summary().clone(),
            accuracy: outcome.report.as_ref().map(|r| r.accuracy),
        };

        *self.slot.write().await = Some(ModelSlot {
            model: Arc::new(outcome.model),
            report: outcome.report,
            trained_at: chrono::Utc::now(),
        });
        info!(
            "Model swapped in: {} trees over {:?}",
            summary.n_trees, summary.features
        );
        Ok(summary)
    }

    /// Install an already-trained model
    pub async fn install(&self, model: TrainedModel, report: Option<EvaluationReport>) {
        *self.slot.write().await = Some(ModelSlot {
            model: Arc::new(model),
            report,
            trained_at: chrono::Utc::now(),
        });
    }

    pub async fn slot(&self) -> Result<ModelSlot> {
        self.slot.read().await.clone().ok_or(CrisisError::ModelNotFitted)
    }

    pub async fn model(&self) -> Result<Arc<TrainedModel>> {
        Ok(self.slot().await?.model)
    }

    /// Predict one scenario and attach the analyst note
    pub async fn simulate(&self, input: SimulationInput) -> Result<SimulationReply> {
        let model = self.model().await?;
        let prediction = model.predict(&input)?;
        let commentary = analyst::comment(&input, &self.config.analyst);
        Ok(SimulationReply {
            inputs: input
                .names()
                .into_iter()
                .map(String::from)
                .zip(input.values())
                .collect(),
            prediction,
            commentary,
            message: commentary.message(),
        })
    }

    /// Scenario built from the last observed row of the history
    pub async fn latest_input(&self) -> Result<SimulationInput> {
        let model = self.model().await?;
        let series = self.series.read().await.clone();
        SimulationInput::latest(model.schema(), &series)
    }

    pub async fn importance(&self) -> Result<FeatureImportance> {
        Ok(FeatureImportance::from_model(&*self.model().await?))
    }

    pub async fn report(&self) -> Result<Option<EvaluationReport>> {
        Ok(self.slot().await?.report)
    }

    pub async fn recent(&self) -> Result<RecentWindow> {
        let series = self.series.read().await.clone();
        let tail = series.tail(self.config.dashboard.recent_window);
        Ok(RecentWindow {
            dates: tail.dates().to_vec(),
            closes: tail.column(Indicator::Sp500)?.to_vec(),
            vix: tail.column(Indicator::Vix)?.to_vec(),
        })
    }
}
