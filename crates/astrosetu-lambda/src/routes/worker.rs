use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use astrosetu_core::models::api::{WorkerRequest, WorkerResponse};
use astrosetu_core::models::report::ReportStatus;
use astrosetu_worker::worker::Disposition;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /report-worker`
///
/// 200 when the report is settled, 202 while another worker holds it, 500
/// when this invocation failed it.
pub async fn run_worker(
    State(state): State<AppState>,
    payload: Result<Json<WorkerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkerResponse>), ApiError> {
    let Json(req) = payload?;

    let outcome = state
        .worker
        .handle(
            req.report_id,
            req.report_type,
            &req.input,
            &req.idempotency_key,
        )
        .await?;

    let status = match (outcome.disposition, outcome.report.status) {
        (Disposition::Generated, ReportStatus::Failed) => StatusCode::INTERNAL_SERVER_ERROR,
        (_, status) if status.is_terminal() => StatusCode::OK,
        _ => StatusCode::ACCEPTED,
    };

    Ok((status, Json(WorkerResponse::from(&outcome.report))))
}
