//! Error types for the crisis warning pipeline

use thiserror::Error;

use crate::data::Indicator;

pub type Result<T> = std::result::Result<T, CrisisError>;

#[derive(Error, Debug)]
pub enum CrisisError {
    #[error("Missing indicator column: {0}")]
    MissingIndicator(Indicator),

    #[error("Insufficient history: need at least {required} rows, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("Degenerate training set: all {rows} training rows have label {label}")]
    DegenerateTrainingSet { label: u8, rows: usize },

    #[error("Feature shape mismatch: expected {expected:?}, got {actual:?}")]
    FeatureShapeMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Model has not been fitted yet")]
    ModelNotFitted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl CrisisError {
    /// True for errors caused by the caller's input rather than the pipeline state
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CrisisError::FeatureShapeMismatch { .. } | CrisisError::InvalidConfig(_)
        )
    }
}
