//! Financial Crisis Early Warning
//!
//! Learns the relationship between macro indicators (VIX, crude oil, the
//! 10Y-2Y yield spread, optionally gold) and subsequent equity drawdowns,
//! then answers what-if questions about hypothetical indicator values.
//!
//! ## Architecture
//!
//! ```text
//! Collector (Yahoo/FRED) → align → CSV store → FeatureBuilder → Trainer → TrainedModel
//!                                                                              ↓
//!                                   Dashboard (axum) ← Session ← predict / importance
//!                                                         ↑
//!                                                      Analyst notes
//! ```

pub mod analyst;
pub mod config;
pub mod data;
pub mod error;
pub mod ml;
pub mod monitor;

#[cfg(test)]
mod config_tests;
