use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Config;
use crate::types::anomaly::AnomalyEvent;
use crate::types::session::ClassificationResult;

pub const START_PATH: &str = "/api/start";
pub const STOP_PATH: &str = "/api/stop";
pub const LATEST_PATH: &str = "/api/latest";
pub const ANOMALIES_PATH: &str = "/api/anomalies";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx response. The message is what the feed view shows verbatim.
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(String),
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// The remote detector service. Every call is a single attempt: no retry, no backoff.
pub trait DetectorApi: Send + Sync + 'static {
    fn start(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn stop(&self) -> impl Future<Output = Result<(), ApiError>> + Send;
    fn latest(&self) -> impl Future<Output = Result<ClassificationResult, ApiError>> + Send;
    fn anomalies(&self) -> impl Future<Output = Result<Vec<AnomalyEvent>, ApiError>> + Send;
}

/// `DetectorApi` over HTTP against a fixed base origin.
#[derive(Debug, Clone)]
pub struct HttpDetectorApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetectorApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_command(&self, path: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(path))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        check_status(path, response).await.map(|_| ())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;
        let response = check_status(path, response).await?;
        response.json::<T>().await.map_err(ApiError::from_reqwest)
    }
}

/// Map a non-2xx response to `ApiError::Status`, logging any `{"error": ...}` body.
async fn check_status(
    path: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(path, status = status.as_u16(), reason = %rejection_reason(&body), "Request rejected");
    Err(status_error(status))
}

fn status_error(status: StatusCode) -> ApiError {
    ApiError::Status(status.as_u16())
}

/// Pull the service's `error` field out of a rejection body, falling back to the raw text.
fn rejection_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl DetectorApi for HttpDetectorApi {
    fn start(&self) -> impl Future<Output = Result<(), ApiError>> + Send {
        self.post_command(START_PATH)
    }

    fn stop(&self) -> impl Future<Output = Result<(), ApiError>> + Send {
        self.post_command(STOP_PATH)
    }

    fn latest(&self) -> impl Future<Output = Result<ClassificationResult, ApiError>> + Send {
        self.get_json(LATEST_PATH)
    }

    fn anomalies(&self) -> impl Future<Output = Result<Vec<AnomalyEvent>, ApiError>> + Send {
        self.get_json(ANOMALIES_PATH)
    }
}
