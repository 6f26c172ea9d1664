//! Feature importance reporting

use serde::Serialize;
use std::collections::BTreeMap;

use super::trainer::TrainedModel;

/// Importance score per feature, in schema order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    entries: Vec<(String, f64)>,
}

impl FeatureImportance {
    /// Mean impurity decrease of the model's forest, normalized to sum 1
    pub fn from_model(model: &TrainedModel) -> Self {
        let entries = model
            .feature_names()
            .iter()
            .cloned()
            .zip(model.forest.feature_importances().iter().copied())
            .collect();
        Self { entries }
    }

    /// Entries in schema order
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Highest score first; ties keep schema order
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        self.entries.iter().cloned().collect()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }
}
