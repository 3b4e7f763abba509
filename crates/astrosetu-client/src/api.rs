use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use astrosetu_core::models::api::{ReportStatusResponse, StartReportRequest};

use crate::error::ClientError;

/// The two service calls the controller makes.
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// `POST /report-generation-start`
    async fn start(
        &self,
        request: &StartReportRequest,
    ) -> Result<ReportStatusResponse, ClientError>;

    /// `GET /report-generation-status?reportId=…`
    async fn status(&self, report_id: Uuid) -> Result<ReportStatusResponse, ClientError>;
}

/// Default per-request timeout. Inline dispatch holds the start request open
/// for the whole generation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// [`ReportApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReportApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpReportApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ReportApi for HttpReportApi {
    async fn start(
        &self,
        request: &StartReportRequest,
    ) -> Result<ReportStatusResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/report-generation-start"))
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    async fn status(&self, report_id: Uuid) -> Result<ReportStatusResponse, ClientError> {
        let response = self
            .client
            .get(self.url("/report-generation-status"))
            .query(&[("reportId", report_id.to_string())])
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}
