//! Configuration loading
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables prefixed with `CRISIS__` (e.g. `CRISIS__TRAINING__RANDOM_SEED=7`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::Indicator;
use crate::error::{CrisisError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub training: TrainingConfig,
    pub collector: CollectorConfig,
    pub dashboard: DashboardConfig,
    pub analyst: AnalystConfig,
}

impl Config {
    /// Load configuration from a TOML file (optional) and the environment
    pub fn load(path: &str) -> Result<Self> {
        let path = shellexpand::tilde(path).into_owned();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("CRISIS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;
        cfg.data.path = shellexpand::tilde(&cfg.data.path).into_owned();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.training.validate()?;
        if self.dashboard.recent_window == 0 {
            return Err(CrisisError::InvalidConfig(
                "dashboard.recent_window must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Dataset file location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file holding the aligned indicator table
    pub path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: "financial_dataset.csv".to_string(),
        }
    }
}

/// Label construction and forest training parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Periods between a feature observation and the label it predicts
    pub lag_horizon: usize,
    /// Return over the horizon below which a row is labeled a crisis
    pub crash_threshold: f64,
    /// Number of trees in the forest
    pub ensemble_size: usize,
    /// Optional depth cap per tree
    pub max_depth: Option<usize>,
    /// Fraction of trailing samples held out for evaluation
    pub test_fraction: f64,
    pub random_seed: u64,
    /// Probability above which the decision is a crash warning
    pub decision_threshold: f64,
    /// Indicators used as lagged features, in schema order
    pub features: Vec<Indicator>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            lag_horizon: 20,
            crash_threshold: -0.05,
            ensemble_size: 100,
            max_depth: None,
            test_fraction: 0.2,
            random_seed: 42,
            decision_threshold: 0.5,
            features: vec![Indicator::Vix, Indicator::Oil, Indicator::YieldSpread],
        }
    }
}

impl TrainingConfig {
    /// Shallower, larger forest with gold added, used for offline evaluation runs
    pub fn evaluation() -> Self {
        Self {
            ensemble_size: 200,
            max_depth: Some(5),
            features: vec![
                Indicator::Vix,
                Indicator::Oil,
                Indicator::YieldSpread,
                Indicator::Gold,
            ],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.lag_horizon == 0 {
            return Err(CrisisError::InvalidConfig(
                "lag_horizon must be positive".into(),
            ));
        }
        if self.ensemble_size == 0 {
            return Err(CrisisError::InvalidConfig(
                "ensemble_size must be positive".into(),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(CrisisError::InvalidConfig(
                "max_depth must be positive when set".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(CrisisError::InvalidConfig(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(CrisisError::InvalidConfig(format!(
                "decision_threshold must be in [0, 1], got {}",
                self.decision_threshold
            )));
        }
        if !self.crash_threshold.is_finite() || self.crash_threshold <= -1.0 {
            return Err(CrisisError::InvalidConfig(format!(
                "crash_threshold must be a finite return above -1, got {}",
                self.crash_threshold
            )));
        }
        if self.features.is_empty() {
            return Err(CrisisError::InvalidConfig("features must not be empty".into()));
        }
        for (i, f) in self.features.iter().enumerate() {
            if *f == Indicator::Sp500 {
                return Err(CrisisError::InvalidConfig(
                    "the equity index defines the label and cannot be a feature".into(),
                ));
            }
            if self.features[..i].contains(f) {
                return Err(CrisisError::InvalidConfig(format!(
                    "duplicate feature {}",
                    f
                )));
            }
        }
        Ok(())
    }
}

/// Remote data providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub start_date: NaiveDate,
    pub yahoo_base_url: String,
    pub fred_base_url: String,
    pub timeout_secs: u64,
    /// Optional indicators to collect in addition to the required ones
    pub optional: Vec<Indicator>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            fred_base_url: "https://fred.stlouisfed.org".to_string(),
            timeout_secs: 30,
            optional: vec![Indicator::Gold, Indicator::UsdKrw],
        }
    }
}

/// HTTP simulator surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    /// Trailing rows of the index returned for charting (one trading year)
    pub recent_window: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            recent_window: 252,
        }
    }
}

/// Thresholds for the plain-language commentary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    /// VIX level treated as extreme fear
    pub fear_level: f64,
    /// Yield spread below which the curve counts as inverted
    pub inversion_level: f64,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            fear_level: 30.0,
            inversion_level: 0.0,
        }
    }
}
