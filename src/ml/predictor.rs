//! Inference on a trained model
//!
//! A [`SimulationInput`] names one value per feature. It must match the
//! model's schema exactly (same names, same order) before the forest is
//! consulted. Inference never mutates the model, so one model can serve
//! any number of concurrent callers.
//!
//! ```ignore
//! let input = SimulationInput::new(vec![
//!     ("vix_lag".into(), 35.0),
//!     ("oil_lag".into(), 90.0),
//!     ("t10y2y_lag".into(), -0.3),
//! ]);
//! let prediction = model.predict(&input)?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::features::{EngineeredSample, FeatureSchema};
use super::trainer::TrainedModel;
use crate::data::{Indicator, ObservationSeries};
use crate::error::{CrisisError, Result};

/// Binary decision derived from the crisis probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    CrashWarning,
    Stable,
}

impl Decision {
    pub fn is_warning(&self) -> bool {
        matches!(self, Decision::CrashWarning)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::CrashWarning => f.write_str("CRASH WARNING"),
            Decision::Stable => f.write_str("STABLE"),
        }
    }
}

/// Crisis probability plus decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub probability: f64,
    pub decision: Decision,
}

/// One hypothetical feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    values: Vec<(String, f64)>,
}

impl SimulationInput {
    pub fn new(values: Vec<(String, f64)>) -> Self {
        Self { values }
    }

    /// Values given per indicator, named after the schema's lagged features
    pub fn from_indicators(values: &[(Indicator, f64)]) -> Self {
        Self::new(values.iter().map(|(i, v)| (i.lagged_name(), *v)).collect())
    }

    /// Features of a historical sample
    pub fn from_sample(schema: &FeatureSchema, sample: &EngineeredSample) -> Self {
        Self::new(
            schema
                .names()
                .iter()
                .cloned()
                .zip(sample.features.iter().copied())
                .collect(),
        )
    }

    /// Latest observed indicator values, i.e. the features of the sample
    /// that will be realized `L` rows after the end of the series
    pub fn latest(schema: &FeatureSchema, series: &ObservationSeries) -> Result<Self> {
        let last = series
            .len()
            .checked_sub(1)
            .ok_or_else(|| CrisisError::InvalidSeries("series is empty".into()))?;
        let mut values = Vec::with_capacity(schema.len());
        for (indicator, name) in schema.indicators().iter().zip(schema.names()) {
            values.push((name.clone(), series.column(*indicator)?[last]));
        }
        Ok(Self::new(values))
    }

    pub fn names(&self) -> Vec<&str> {
        self.values.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|(_, v)| *v)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Value of the lagged feature built from `indicator`, if present
    pub fn indicator(&self, indicator: Indicator) -> Option<f64> {
        self.get(&indicator.lagged_name())
    }
}

impl TrainedModel {
    /// Crisis probability and decision for one input
    pub fn predict(&self, input: &SimulationInput) -> Result<Prediction> {
        self.schema.check(&input.names())?;
        let features: Vec<f64> = input.values().collect();
        if let Some((name, v)) = input.values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CrisisError::Data(format!(
                "feature {} must be finite, got {}",
                name, v
            )));
        }
        Ok(self.classify(&features))
    }

    /// Predictions for historical samples built with this model's schema
    pub fn predict_samples(&self, samples: &[EngineeredSample]) -> Result<Vec<Prediction>> {
        samples
            .iter()
            .map(|s| self.predict(&SimulationInput::from_sample(&self.schema, s)))
            .collect()
    }

    /// Apply the forest to an already-ordered feature vector
    pub(crate) fn classify(&self, features: &[f64]) -> Prediction {
        let probability = self.forest.predict_proba(features);
        let decision = if probability > self.decision_threshold {
            Decision::CrashWarning
        } else {
            Decision::Stable
        };
        Prediction {
            probability,
            decision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serialization() {
        assert_eq!(serde_json::to_string(&Decision::CrashWarning).unwrap(), "\"CRASH_WARNING\"");
        assert_eq!(serde_json::to_string(&Decision::Stable).unwrap(), "\"STABLE\"");
        assert_eq!(Decision::CrashWarning.to_string(), "CRASH WARNING");
    }

    #[test]
    fn test_input_lookup_by_indicator() {
        let input = SimulationInput::from_indicators(&[(Indicator::Vix, 42.0), (Indicator::Oil, 80.0)]);
        assert_eq!(input.names(), vec!["vix_lag", "oil_lag"]);
        assert_eq!(input.indicator(Indicator::Vix), Some(42.0));
        assert_eq!(input.indicator(Indicator::Gold), None);
    }
}
