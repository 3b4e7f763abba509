use thiserror::Error;

use crate::models::report::ReportStatus;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown report type: {0}")]
    UnknownReportType(String),

    #[error("illegal status transition from {from} to {to}")]
    IllegalTransition { from: ReportStatus, to: ReportStatus },

    #[error("generation lease held by {owner} until {expires_at}")]
    LeaseHeld {
        owner: uuid::Uuid,
        expires_at: jiff::Timestamp,
    },

    #[error("generation lease lost by {owner}")]
    LeaseLost { owner: uuid::Uuid },

    #[error("invalid uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
