use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("precondition failed for key: {key}")]
    PreconditionFailed { key: String },

    #[error("version mismatch for report {report_id} (expected {expected})")]
    VersionMismatch {
        report_id: uuid::Uuid,
        expected: String,
    },

    #[error("report {report_id} does not exist")]
    MissingReport { report_id: uuid::Uuid },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("S3 GetObject error: {0}")]
    GetObject(String),

    #[error("S3 PutObject error: {0}")]
    PutObject(String),

    #[error("S3 DeleteObject error: {0}")]
    DeleteObject(String),
}

impl StorageError {
    /// Whether a compare-and-swap lost to a concurrent writer.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::VersionMismatch { .. } | StorageError::PreconditionFailed { .. }
        )
    }
}
