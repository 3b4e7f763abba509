//! Request and response bodies shared by the HTTP service and the client.
//!
//! Field names are camelCase on the wire to match the web frontend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::birth::BirthInput;
use super::report::{ErrorCode, ReportContent, ReportStatus, ReportType, StoredReport};

/// Body of `POST /report-generation-start`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StartReportRequest {
    pub report_type: ReportType,
    pub input: BirthInput,
    /// Derived from the report type and input when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

/// Response of `POST /report-generation-start` and
/// `GET /report-generation-status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReportStatusResponse {
    pub status: ReportStatus,
    pub report_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ReportContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&StoredReport> for ReportStatusResponse {
    fn from(report: &StoredReport) -> Self {
        Self {
            status: report.status,
            report_id: report.report_id,
            content: report.content.clone(),
            error_code: report.error_code,
            error_message: report.error_message.clone(),
        }
    }
}

/// Body of `POST /report-worker`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkerRequest {
    pub report_id: Uuid,
    pub report_type: ReportType,
    pub input: BirthInput,
    pub idempotency_key: String,
}

/// Failure detail carried by a worker response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkerError {
    pub code: ErrorCode,
    pub message: String,
}

/// Response of `POST /report-worker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkerResponse {
    pub ok: bool,
    pub status: ReportStatus,
    pub report_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ReportContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkerError>,
}

impl From<&StoredReport> for WorkerResponse {
    fn from(report: &StoredReport) -> Self {
        let error = match (report.error_code, &report.error_message) {
            (Some(code), Some(message)) => Some(WorkerError {
                code,
                message: message.clone(),
            }),
            (None, Some(message)) => Some(WorkerError {
                code: ErrorCode::GenerationError,
                message: message.clone(),
            }),
            _ => None,
        };
        Self {
            ok: report.status != ReportStatus::Failed,
            status: report.status,
            report_id: report.report_id,
            content: report.content.clone(),
            error,
        }
    }
}
