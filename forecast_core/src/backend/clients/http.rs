//! reqwest client for the remote analytics service.

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::api::{
    AdvancedAnalytics, ExportFile, FeatureImportance, ForecastResult, LoadedDataset, ResultSet,
    SeasonalityAnalysis, SingleModelRun,
};
use crate::backend::client::*;
use crate::backend::wire::{
    self, ForecastRequest, InsightsPayload, InsightsRequest, LoadDataPayload, SingleModelPayload,
    SingleModelRequest, TrainModelsPayload, TrainingRequest, DEFAULT_EXPORT_FILE_NAME,
};

/// HTTP client for the analytics service.
///
/// Every request carries the configured timeout; each call is a single
/// attempt with no automatic retry.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for the service rooted at `base_url`
    /// (for example `http://localhost:5000/api`).
    pub fn new(base_url: &str, timeout: Duration) -> BackendResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::Configuration(
                "HTTP backend requires a base URL".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        let url = self.endpoint(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        read_envelope(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> BackendResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_envelope(response).await
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Transport("request to analytics service timed out".to_string())
    } else {
        BackendError::Transport(format!("Failed to reach analytics service: {}", err))
    }
}

/// Decode an enveloped JSON response.
///
/// A JSON body is checked for `success` whatever the status code; a non-JSON
/// body on an error status is a transport failure.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    match serde_json::from_str::<Value>(&body) {
        Ok(value) => wire::decode(wire::check_envelope(value)?),
        Err(_) if !status.is_success() => Err(BackendError::Transport(format!(
            "HTTP {}: {}",
            status,
            body.trim()
        ))),
        Err(e) => Err(BackendError::Decode(format!("response is not JSON: {}", e))),
    }
}

#[async_trait]
impl DataSource for HttpBackend {
    async fn health_check(&self) -> BackendResult<bool> {
        match self.client.get(&self.base_url).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("Health check against {} failed: {}", self.base_url, e);
                Ok(false)
            }
        }
    }

    async fn load_data(&self) -> BackendResult<LoadedDataset> {
        let payload: LoadDataPayload = self.get_json("load-data").await?;
        payload.into_dataset()
    }

    async fn upload_csv(&self, file_name: &str, bytes: Vec<u8>) -> BackendResult<()> {
        let url = self.endpoint("upload-csv");
        debug!("POST {} ({} bytes, file {})", url, bytes.len(), file_name);

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .map_err(|e| BackendError::Configuration(format!("Invalid upload part: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let _: Value = read_envelope(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelTrainer for HttpBackend {
    async fn train_models(&self, request: &TrainingRequest) -> BackendResult<ResultSet> {
        let payload: TrainModelsPayload = self.post_json("train-models", request).await?;
        Ok(payload.into_result_set())
    }

    async fn train_single_model(
        &self,
        request: &SingleModelRequest,
    ) -> BackendResult<SingleModelRun> {
        let payload: SingleModelPayload = self.post_json("train-single-model", request).await?;
        payload.into_run()
    }

    async fn generate_forecast(&self, request: &ForecastRequest) -> BackendResult<ForecastResult> {
        self.post_json("generate-forecast", request).await
    }
}

#[async_trait]
impl InsightSource for HttpBackend {
    async fn ai_insights(&self, request: &InsightsRequest) -> BackendResult<String> {
        let payload: InsightsPayload = self.post_json("ai-insights", request).await?;
        Ok(payload.insights)
    }

    async fn seasonality_analysis(&self) -> BackendResult<SeasonalityAnalysis> {
        self.get_json("seasonality-analysis").await
    }

    async fn feature_importance(&self) -> BackendResult<FeatureImportance> {
        self.get_json("feature-importance").await
    }

    async fn advanced_analytics(&self) -> BackendResult<AdvancedAnalytics> {
        self.get_json("advanced-analytics").await
    }

    async fn export_data(&self) -> BackendResult<ExportFile> {
        let url = self.endpoint("export-data");
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            // Failures come back as a JSON envelope
            let _: Value = read_envelope(response).await?;
            return Err(BackendError::Rejected("export failed".to_string()));
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(wire::filename_from_content_disposition)
            .unwrap_or_else(|| DEFAULT_EXPORT_FILE_NAME.to_string());
        let bytes = response.bytes().await.map_err(transport_error)?;

        Ok(ExportFile {
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}
