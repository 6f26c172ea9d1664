//! Crisis prediction pipeline
//!
//! ```text
//! ObservationSeries ─▶ FeatureBuilder ─▶ Trainer ─▶ TrainedModel ─┬─▶ predict(SimulationInput)
//!                                                                 └─▶ FeatureImportance
//! ```
//!
//! - Label & feature construction with lagged indicators
//! - Chronological train/test split with balanced class weights
//! - Seeded random forest of CART trees
//! - Per-call inference against an immutable model
//! - Impurity-based feature importance

pub mod ensemble;
pub mod explain;
pub mod features;
pub mod metrics;
pub mod predictor;
pub mod trainer;
pub mod tree;


pub use ensemble::{ForestParams, RandomForest};
pub use explain::FeatureImportance;
pub use features::{EngineeredSample, FeatureBuilder, FeatureSchema, SampleTable};
pub use metrics::{ClassMetrics, EvaluationReport};
pub use predictor::{Decision, Prediction, SimulationInput};
pub use trainer::{chronological_split, evaluate, SplitSummary, Trainer, TrainedModel, TrainingOutcome};
pub use tree::{DecisionTree, TreeNode, TreeParams};
