//! In-process implementation of [`ReportStore`].
//!
//! Records live in a `HashMap` behind a `RwLock` and are lost on restart.
//! Used for local development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use astrosetu_core::models::report::StoredReport;

use crate::error::StorageError;
use crate::store::{CreateOutcome, ReportStore, Versioned};

#[derive(Default)]
struct Records {
    reports: HashMap<Uuid, (StoredReport, u64)>,
    by_key: HashMap<String, Uuid>,
}

impl Records {
    fn versioned(&self, id: Uuid) -> Option<Versioned<StoredReport>> {
        self.reports.get(&id).map(|(report, version)| Versioned {
            value: report.clone(),
            version: version.to_string(),
        })
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    records: RwLock<Records>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record without any checks.
    ///
    /// Lets tests start from states the normal lifecycle would only reach
    /// through a crash, such as an expired lease.
    pub async fn seed(&self, report: StoredReport) -> Versioned<StoredReport> {
        let mut records = self.records.write().await;
        let id = report.report_id;
        records.by_key.insert(report.idempotency_key.clone(), id);
        let version = records.reports.get(&id).map_or(1, |(_, v)| v + 1);
        records.reports.insert(id, (report.clone(), version));
        Versioned {
            value: report,
            version: version.to_string(),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.reports.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create_or_get(&self, report: StoredReport) -> Result<CreateOutcome, StorageError> {
        let mut records = self.records.write().await;
        if let Some(existing_id) = records.by_key.get(&report.idempotency_key).copied() {
            let current = records
                .versioned(existing_id)
                .ok_or(StorageError::MissingReport {
                    report_id: existing_id,
                })?;
            return Ok(CreateOutcome::Existing(current));
        }

        let id = report.report_id;
        records.by_key.insert(report.idempotency_key.clone(), id);
        records.reports.insert(id, (report.clone(), 1));
        Ok(CreateOutcome::Created(Versioned {
            value: report,
            version: "1".to_string(),
        }))
    }

    async fn get(&self, report_id: Uuid) -> Result<Option<Versioned<StoredReport>>, StorageError> {
        Ok(self.records.read().await.versioned(report_id))
    }

    async fn compare_and_swap(
        &self,
        expected_version: &str,
        report: StoredReport,
    ) -> Result<Versioned<StoredReport>, StorageError> {
        let mut records = self.records.write().await;
        let report_id = report.report_id;
        let (stored, version) =
            records
                .reports
                .get_mut(&report_id)
                .ok_or(StorageError::MissingReport { report_id })?;

        if version.to_string() != expected_version {
            return Err(StorageError::VersionMismatch {
                report_id,
                expected: expected_version.to_string(),
            });
        }

        *stored = report.clone();
        *version += 1;
        Ok(Versioned {
            value: report,
            version: version.to_string(),
        })
    }
}
