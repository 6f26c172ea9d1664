//! Plain-language reading of a simulated scenario

use serde::Serialize;

use crate::config::AnalystConfig;
use crate::data::Indicator;
use crate::ml::SimulationInput;

/// Headline commentary; fear outranks an inverted curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Commentary {
    ExtremeFear,
    InvertedCurve,
    Stable,
}

impl Commentary {
    pub fn message(&self) -> &'static str {
        match self {
            Commentary::ExtremeFear => {
                "Extreme market fear (high VIX). Historical patterns suggest a potential sell-off."
            }
            Commentary::InvertedCurve => {
                "The yield curve is inverted. This is a strong historical indicator of an incoming recession."
            }
            Commentary::Stable => {
                "Current indicators suggest a stable market environment based on historical data."
            }
        }
    }

    /// Whether the note should be shown as a warning
    pub fn is_alert(&self) -> bool {
        !matches!(self, Commentary::Stable)
    }
}

/// Comment on the VIX and yield spread values in `input`. Missing values
/// never trigger a note.
pub fn comment(input: &SimulationInput, config: &AnalystConfig) -> Commentary {
    let vix = input.indicator(Indicator::Vix);
    let spread = input.indicator(Indicator::YieldSpread);

    if vix.is_some_and(|v| v > config.fear_level) {
        Commentary::ExtremeFear
    } else if spread.is_some_and(|s| s < config.inversion_level) {
        Commentary::InvertedCurve
    } else {
        Commentary::Stable
    }
}
