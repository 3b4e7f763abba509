use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use jiff::{Timestamp, Zoned};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use astrosetu_audit::events::{AuditAction, AuditEvent};
use astrosetu_core::idempotency;
use astrosetu_core::models::api::{ReportStatusResponse, StartReportRequest};
use astrosetu_core::models::report::{ReportStatus, StoredReport};
use astrosetu_storage::store::CreateOutcome;

use crate::config::DispatchMode;
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /report-generation-start`
///
/// Creates the record for the request's idempotency key, or returns the one
/// that already exists, then dispatches the worker per the configured mode.
pub async fn start_report(
    State(state): State<AppState>,
    payload: Result<Json<StartReportRequest>, JsonRejection>,
) -> Result<Json<ReportStatusResponse>, ApiError> {
    let Json(req) = payload?;
    req.input.validate(Zoned::now().date())?;

    let key = match req.idempotency_key {
        Some(key) => {
            idempotency::validate_key(&key)?;
            key
        }
        None => idempotency::derive_key(req.report_type, &req.input)?,
    };

    let initial = match state.dispatch {
        DispatchMode::External => ReportStatus::Pending,
        _ => ReportStatus::Processing,
    };
    let record = StoredReport::new(key, req.report_type, req.input, initial, Timestamp::now())?;

    let report = match state.store.create_or_get(record).await? {
        CreateOutcome::Created(created) => {
            info!(
                report_id = %created.value.report_id,
                report_type = %created.value.report_type,
                "report created"
            );
            AuditEvent::new(AuditAction::ReportCreated, &created.value, "api").emit();
            created.value
        }
        CreateOutcome::Existing(existing) => {
            if existing.value.report_type != req.report_type {
                return Err(ApiError::BadRequest(format!(
                    "idempotency key already used for a {} report",
                    existing.value.report_type
                )));
            }
            AuditEvent::new(AuditAction::ReportResumed, &existing.value, "api").emit();
            existing.value
        }
    };

    if report.is_terminal() {
        return Ok(Json(ReportStatusResponse::from(&report)));
    }

    let report = match state.dispatch {
        DispatchMode::Inline => run_worker(&state, report).await,
        DispatchMode::Background => {
            let worker = state.worker.clone();
            let spawned = report.clone();
            tokio::spawn(async move {
                if let Err(e) = worker.run(&spawned).await {
                    warn!(
                        report_id = %spawned.report_id,
                        error = %e,
                        "background report worker failed"
                    );
                }
            });
            report
        }
        DispatchMode::OnPoll | DispatchMode::External => report,
    };

    Ok(Json(ReportStatusResponse::from(&report)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub report_id: String,
}

/// `GET /report-generation-status?reportId=…`
pub async fn report_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<ReportStatusResponse>, ApiError> {
    let Query(query) = query?;
    let report_id = parse_report_id(&query.report_id)?;

    let report = state
        .store
        .get(report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("report {report_id} not found")))?
        .value;

    let report = if state.dispatch == DispatchMode::OnPoll && !report.is_terminal() {
        run_worker(&state, report).await
    } else {
        report
    };

    Ok(Json(ReportStatusResponse::from(&report)))
}

/// `GET /reports/{id}`: the full stored record.
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredReport>, ApiError> {
    let report_id = parse_report_id(&id)?;
    let report = state
        .store
        .get(report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("report {report_id} not found")))?;
    Ok(Json(report.value))
}

fn parse_report_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse::<Uuid>()
        .map_err(|e| ApiError::BadRequest(format!("invalid reportId {raw:?}: {e}")))
}

/// Run the worker in the request and return whatever it leaves behind.
///
/// Worker errors are logged, not surfaced: the record is still readable and
/// the client keeps polling.
async fn run_worker(state: &AppState, report: StoredReport) -> StoredReport {
    match state.worker.run(&report).await {
        Ok(outcome) => outcome.report,
        Err(e) => {
            warn!(report_id = %report.report_id, error = %e, "report worker failed");
            report
        }
    }
}
