//! Label & feature construction
//!
//! Turns an observation series into supervised samples. For each date `t`
//! with enough history:
//!
//! ```text
//! return[t]    = index[t] / index[t - L] - 1
//! label[t]     = 1 if return[t] < crash_threshold else 0
//! feature_i[t] = indicator_i[t - L]
//! ```
//!
//! Features never look past `t - L`, the start of the window that defines
//! the label.

use chrono::NaiveDate;
use tracing::info;

use crate::config::TrainingConfig;
use crate::data::{Indicator, ObservationSeries};
use crate::error::{CrisisError, Result};

/// Ordered, named feature columns a model is trained on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    indicators: Vec<Indicator>,
    names: Vec<String>,
    lag: usize,
}

impl FeatureSchema {
    pub fn new(indicators: Vec<Indicator>, lag: usize) -> Self {
        let names = indicators.iter().map(|i| i.lagged_name()).collect();
        Self {
            indicators,
            names,
            lag,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Exact match on count, names and order
    pub fn check<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let matches = names.len() == self.names.len()
            && names
                .iter()
                .zip(&self.names)
                .all(|(given, expected)| given.as_ref() == expected);
        if matches {
            Ok(())
        } else {
            Err(CrisisError::FeatureShapeMismatch {
                expected: self.names.clone(),
                actual: names.iter().map(|n| n.as_ref().to_string()).collect(),
            })
        }
    }
}

/// One supervised row
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredSample {
    /// Date the label is realized
    pub date: NaiveDate,
    /// Date the features were observed (`date` minus L rows)
    pub feature_date: NaiveDate,
    /// Feature values in schema order
    pub features: Vec<f64>,
    /// Index return from `feature_date` to `date`
    pub forward_return: f64,
    /// 1 = crisis
    pub label: u8,
}

/// Time-ordered samples sharing one schema
#[derive(Debug, Clone)]
pub struct SampleTable {
    schema: FeatureSchema,
    samples: Vec<EngineeredSample>,
}

impl SampleTable {
    pub fn new(schema: FeatureSchema, samples: Vec<EngineeredSample>) -> Self {
        Self { schema, samples }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn samples(&self) -> &[EngineeredSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.samples.iter().filter(|s| s.label == 1).count()
    }

    /// Share of crisis rows
    pub fn positive_rate(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.positives() as f64 / self.samples.len() as f64
        }
    }
}

/// Builds [`SampleTable`]s from observation series
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    lag: usize,
    crash_threshold: f64,
    features: Vec<Indicator>,
}

impl FeatureBuilder {
    pub fn new(lag: usize, crash_threshold: f64, features: Vec<Indicator>) -> Self {
        Self {
            lag,
            crash_threshold,
            features,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(
            config.lag_horizon,
            config.crash_threshold,
            config.features.clone(),
        )
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.features.clone(), self.lag)
    }

    /// Rows the series needs before any sample can be built
    pub fn min_rows(&self) -> usize {
        2 * self.lag + 1
    }

    /// Samples that must survive the boundary and non-finite drops
    pub fn min_samples(&self) -> usize {
        self.lag + 1
    }

    pub fn build(&self, series: &ObservationSeries) -> Result<SampleTable> {
        let index = series.column(Indicator::Sp500)?;
        let columns = self
            .features
            .iter()
            .map(|f| series.column(*f))
            .collect::<Result<Vec<_>>>()?;

        if series.len() < self.min_rows() {
            return Err(CrisisError::InsufficientHistory {
                required: self.min_rows(),
                actual: series.len(),
            });
        }

        let lag = self.lag;
        let dates = series.dates();
        let mut samples = Vec::with_capacity(series.len() - lag);

        for t in lag..series.len() {
            let origin = t - lag;
            let forward_return = index[t] / index[origin] - 1.0;
            if !forward_return.is_finite() {
                continue;
            }
            let features: Vec<f64> = columns.iter().map(|c| c[origin]).collect();
            if features.iter().any(|v| !v.is_finite()) {
                continue;
            }
            samples.push(EngineeredSample {
                date: dates[t],
                feature_date: dates[origin],
                features,
                forward_return,
                label: u8::from(forward_return < self.crash_threshold),
            });
        }

        if samples.len() < self.min_samples() {
            return Err(CrisisError::InsufficientHistory {
                required: self.min_samples(),
                actual: samples.len(),
            });
        }

        let table = SampleTable::new(self.schema(), samples);
        info!(
            "Built {} samples (lag {}, {} features), crisis rate {:.1}%",
            table.len(),
            lag,
            table.schema().len(),
            table.positive_rate() * 100.0
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn series(index: Vec<f64>) -> ObservationSeries {
        let n = index.len();
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let dates = (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect();
        let mut columns = BTreeMap::new();
        columns.insert(Indicator::Sp500, index);
        columns.insert(Indicator::Vix, (0..n).map(|i| 10.0 + i as f64).collect());
        columns.insert(Indicator::Oil, (0..n).map(|i| 50.0 + i as f64).collect());
        columns.insert(Indicator::YieldSpread, vec![0.5; n]);
        ObservationSeries::new(dates, columns).unwrap()
    }

    fn builder() -> FeatureBuilder {
        FeatureBuilder::from_config(&TrainingConfig::default())
    }

    #[test]
    fn test_schema_names_follow_config_order() {
        let schema = builder().schema();
        assert_eq!(schema.names(), &["vix_lag", "oil_lag", "t10y2y_lag"]);
        assert_eq!(schema.lag(), 20);
    }

    #[test]
    fn test_schema_check_rejects_reordering() {
        let schema = builder().schema();
        assert!(schema.check(&["vix_lag", "oil_lag", "t10y2y_lag"]).is_ok());
        assert!(matches!(
            schema.check(&["oil_lag", "vix_lag", "t10y2y_lag"]),
            Err(CrisisError::FeatureShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_features_are_lagged_by_horizon() {
        let table = builder().build(&series(vec![100.0; 60])).unwrap();
        assert_eq!(table.len(), 40);

        let first = &table.samples()[0];
        // Row 20 carries indicators from row 0
        assert_eq!(first.features, vec![10.0, 50.0, 0.5]);
        assert_eq!(first.date - first.feature_date, chrono::Duration::days(20));
    }

    #[test]
    fn test_label_marks_drops_beyond_threshold() {
        let mut index = vec![100.0; 60];
        index[30] = 96.0;
        index[31] = 94.0;
        let table = builder().build(&series(index)).unwrap();

        let at = |day: usize| table.samples()[day - 20].label;
        assert_eq!(at(30), 0);
        assert_eq!(at(31), 1);
        assert_eq!(table.positives(), 1);
    }

    #[test]
    fn test_non_finite_rows_are_dropped() {
        let mut s = vec![100.0; 60];
        s[5] = 0.0; // return into row 25 is infinite
        let table = builder().build(&series(s)).unwrap();
        assert_eq!(table.len(), 39);
        assert!(table.samples().iter().all(|x| x.forward_return.is_finite()));
    }

    #[test]
    fn test_min_rows_boundary() {
        assert!(builder().build(&series(vec![100.0; 41])).is_ok());
        assert!(matches!(
            builder().build(&series(vec![100.0; 40])),
            Err(CrisisError::InsufficientHistory { required: 41, actual: 40 })
        ));
    }

    #[test]
    fn test_missing_feature_column() {
        let b = FeatureBuilder::new(20, -0.05, vec![Indicator::Vix, Indicator::Gold]);
        assert!(matches!(
            b.build(&series(vec![100.0; 60])),
            Err(CrisisError::MissingIndicator(Indicator::Gold))
        ));
    }
}
