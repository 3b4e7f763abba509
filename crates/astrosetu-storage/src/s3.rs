//! S3-backed implementation of [`ReportStore`].
//!
//! Layout (see `astrosetu_core::store_keys`):
//!
//! - `reports/{report_id}.json`: the `StoredReport` itself. Updates use
//!   `If-Match` on the ETag, which is the record version.
//! - `idempotency/{sha256(key)}.json`: an [`IdempotencyIndex`] naming the
//!   report created for a key, written once with `If-None-Match: *`.
//!
//! Creation writes the record first and the index second. If the index
//! write loses, the freshly written record is deleted and the winner's
//! record is returned, so an index entry always points at a record that
//! exists.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use astrosetu_core::models::report::StoredReport;
use astrosetu_core::store_keys;

use crate::error::StorageError;
use crate::objects::{self, WriteCondition};
use crate::state;
use crate::store::{CreateOutcome, ReportStore, Versioned};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyIndex {
    pub idempotency_key: String,
    pub report_id: Uuid,
}

#[derive(Clone)]
pub struct S3ReportStore {
    client: Client,
    bucket: String,
}

impl S3ReportStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn load(&self, report_id: Uuid) -> Result<Option<Versioned<StoredReport>>, StorageError> {
        let key = store_keys::report(report_id);
        let loaded = state::try_load_json(&self.client, &self.bucket, &key).await?;
        Ok(loaded.map(|(value, version)| Versioned { value, version }))
    }

    async fn load_by_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Versioned<StoredReport>>, StorageError> {
        let index_key = store_keys::idempotency(idempotency_key);
        let Some((index, _)) =
            state::try_load_json::<IdempotencyIndex>(&self.client, &self.bucket, &index_key)
                .await?
        else {
            return Ok(None);
        };
        self.load(index.report_id).await
    }
}

#[async_trait]
impl ReportStore for S3ReportStore {
    async fn create_or_get(&self, report: StoredReport) -> Result<CreateOutcome, StorageError> {
        let report_key = store_keys::report(report.report_id);
        let index_key = store_keys::idempotency(&report.idempotency_key);

        let version = state::save_json(
            &self.client,
            &self.bucket,
            &report_key,
            &report,
            WriteCondition::IfAbsent,
        )
        .await?;

        let index = IdempotencyIndex {
            idempotency_key: report.idempotency_key.clone(),
            report_id: report.report_id,
        };
        match state::save_json(
            &self.client,
            &self.bucket,
            &index_key,
            &index,
            WriteCondition::IfAbsent,
        )
        .await
        {
            Ok(_) => {
                debug!(report_id = %report.report_id, "created report record");
                Ok(CreateOutcome::Created(Versioned {
                    value: report,
                    version,
                }))
            }
            Err(StorageError::PreconditionFailed { .. }) => {
                if let Err(e) =
                    objects::delete_object(&self.client, &self.bucket, &report_key).await
                {
                    warn!(
                        report_id = %report.report_id,
                        error = %e,
                        "failed to remove orphaned report record"
                    );
                }
                let existing = self.load_by_key(&report.idempotency_key).await?.ok_or(
                    StorageError::NotFound {
                        key: index_key.clone(),
                    },
                )?;
                Ok(CreateOutcome::Existing(existing))
            }
            Err(e) => Err(e),
        }
    }

    async fn get(&self, report_id: Uuid) -> Result<Option<Versioned<StoredReport>>, StorageError> {
        self.load(report_id).await
    }

    async fn compare_and_swap(
        &self,
        expected_version: &str,
        report: StoredReport,
    ) -> Result<Versioned<StoredReport>, StorageError> {
        let key = store_keys::report(report.report_id);
        let version = state::save_json(
            &self.client,
            &self.bucket,
            &key,
            &report,
            WriteCondition::IfMatch(expected_version),
        )
        .await
        .map_err(|e| match e {
            StorageError::PreconditionFailed { .. } => StorageError::VersionMismatch {
                report_id: report.report_id,
                expected: expected_version.to_string(),
            },
            other => other,
        })?;

        Ok(Versioned {
            value: report,
            version,
        })
    }
}
