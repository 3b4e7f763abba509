use thiserror::Error;
use uuid::Uuid;

use astrosetu_core::error::CoreError;
use astrosetu_core::models::report::ReportType;
use astrosetu_storage::error::StorageError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("report {report_id} not found")]
    NotFound { report_id: Uuid },

    #[error("report {report_id} is a {stored} report, not {requested}")]
    ReportTypeMismatch {
        report_id: Uuid,
        stored: ReportType,
        requested: ReportType,
    },

    #[error("gave up on report {report_id} after {attempts} conflicting writes")]
    Contention { report_id: Uuid, attempts: u32 },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transition(#[from] CoreError),
}
