//! Derived analytics: narrative insights, read-only analytics panels, export.

use async_trait::async_trait;

use super::error::BackendResult;
use crate::api::{AdvancedAnalytics, ExportFile, FeatureImportance, SeasonalityAnalysis};
use crate::backend::wire::InsightsRequest;

/// Derived analytics computed by the service from its latest training run.
///
/// The three panel endpoints are independent of each other; callers treat a
/// failure of one as local to that panel.
#[async_trait]
pub trait InsightSource: Send + Sync {
    /// Generate narrative insights (markdown) for a training run.
    async fn ai_insights(&self, request: &InsightsRequest) -> BackendResult<String>;

    async fn seasonality_analysis(&self) -> BackendResult<SeasonalityAnalysis>;

    async fn feature_importance(&self) -> BackendResult<FeatureImportance>;

    async fn advanced_analytics(&self) -> BackendResult<AdvancedAnalytics>;

    /// Download the service's CSV export of the latest run.
    async fn export_data(&self) -> BackendResult<ExportFile>;
}
