use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use astrosetu_core::models::report::StoredReport;

use crate::error::StorageError;

/// A value together with the opaque version it was read at.
///
/// Versions are only meaningful to the store that issued them: a counter for
/// the in-memory store, an ETag for S3.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: String,
}

/// Result of [`ReportStore::create_or_get`].
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// No record existed for the idempotency key; this one was stored.
    Created(Versioned<StoredReport>),
    /// A record already existed for the key; the submitted one was discarded.
    Existing(Versioned<StoredReport>),
}

impl CreateOutcome {
    pub fn was_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }

    pub fn into_inner(self) -> Versioned<StoredReport> {
        match self {
            CreateOutcome::Created(v) | CreateOutcome::Existing(v) => v,
        }
    }
}

/// Persistence for [`StoredReport`] records.
///
/// Every mutation after creation goes through [`ReportStore::compare_and_swap`],
/// so two workers racing on one record cannot both land a write: the loser
/// gets a conflict error (see [`StorageError::is_conflict`]) and must re-read.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Store `report` unless a record already exists for its idempotency key.
    async fn create_or_get(&self, report: StoredReport) -> Result<CreateOutcome, StorageError>;

    /// Read a record by report id.
    async fn get(&self, report_id: Uuid) -> Result<Option<Versioned<StoredReport>>, StorageError>;

    /// Replace a record only if it is still at `expected_version`.
    async fn compare_and_swap(
        &self,
        expected_version: &str,
        report: StoredReport,
    ) -> Result<Versioned<StoredReport>, StorageError>;
}

#[async_trait]
impl<S: ReportStore + ?Sized> ReportStore for Arc<S> {
    async fn create_or_get(&self, report: StoredReport) -> Result<CreateOutcome, StorageError> {
        (**self).create_or_get(report).await
    }

    async fn get(&self, report_id: Uuid) -> Result<Option<Versioned<StoredReport>>, StorageError> {
        (**self).get(report_id).await
    }

    async fn compare_and_swap(
        &self,
        expected_version: &str,
        report: StoredReport,
    ) -> Result<Versioned<StoredReport>, StorageError> {
        (**self).compare_and_swap(expected_version, report).await
    }
}
