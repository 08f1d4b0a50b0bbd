//! Service layer for aggregation and orchestration.
//!
//! The aggregation modules are pure functions over already-fetched data. The
//! orchestrator owns session state and calls out to the analytics service.

pub mod metrics;
pub mod orchestrator;
pub mod scenarios;
pub mod series;
pub mod thresholds;

pub use metrics::{average_accuracy, model_consensus, select_best_model, summarize};
pub use orchestrator::{AnalysisOrchestrator, AnalyticsPanels, OrchestratorSettings};
pub use scenarios::{project_scenarios, project_scenarios_with, ScenarioBand};
pub use series::{compose_comparison, merge_historical_and_forecast};
pub use thresholds::{apply_thresholds, ThresholdCriteria};
