use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde_json::json;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use astrosetu_audit::events::{AuditAction, AuditEvent};
use astrosetu_bedrock::generator::{GeneratedReport, ReportGenerator};
use astrosetu_core::error::CoreError;
use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{
    Degradation, ErrorCode, ReportStatus, ReportType, StoredReport,
};
use astrosetu_core::policy;
use astrosetu_storage::store::{ReportStore, Versioned};

use crate::error::WorkerError;
use crate::settle::{Settlement, settle};
use crate::validate::{PolicyValidator, ReportValidator};

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub lease_ttl: Duration,
    /// Must be comfortably shorter than `lease_ttl`.
    pub heartbeat_interval: Duration,
    /// Compare-and-swap attempts per write before giving up.
    pub max_write_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lease_ttl: policy::LEASE_TTL,
            heartbeat_interval: policy::HEARTBEAT_INTERVAL,
            max_write_attempts: 5,
        }
    }
}

/// How one invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// This invocation generated the report and wrote its terminal status.
    Generated,
    /// The report was already completed or failed; nothing was done.
    AlreadyTerminal,
    /// Another worker holds a live lease on the report.
    InProgress,
    /// The lease was lost mid-generation and the result was discarded.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    /// The record as last read or written by this invocation.
    pub report: StoredReport,
    pub disposition: Disposition,
}

impl WorkerOutcome {
    fn new(report: StoredReport, disposition: Disposition) -> Self {
        Self {
            report,
            disposition,
        }
    }
}

enum Claim {
    Claimed(Versioned<StoredReport>),
    Done(WorkerOutcome),
}

enum Generation {
    Finished {
        result: Result<GeneratedReport, String>,
        current: Versioned<StoredReport>,
    },
    LeaseLost(StoredReport),
}

enum Renewal {
    Renewed(Versioned<StoredReport>),
    Lost(StoredReport),
}

/// Generates stored reports.
///
/// Any number of invocations may run for the same report. The lease taken in
/// [`ReportWorker::handle`] through compare-and-swap ensures at most one of
/// them calls the generator at a time, and the terminal write is conditional
/// on still holding that lease, so a report is settled exactly once.
#[derive(Clone)]
pub struct ReportWorker {
    store: Arc<dyn ReportStore>,
    generator: Arc<dyn ReportGenerator>,
    validator: Arc<dyn ReportValidator>,
    config: WorkerConfig,
}

impl ReportWorker {
    pub fn new(store: Arc<dyn ReportStore>, generator: Arc<dyn ReportGenerator>) -> Self {
        Self {
            store,
            generator,
            validator: Arc::new(PolicyValidator),
            config: WorkerConfig::default(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ReportValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run the worker for a record already in hand.
    pub async fn run(&self, report: &StoredReport) -> Result<WorkerOutcome, WorkerError> {
        self.handle(
            report.report_id,
            report.report_type,
            &report.input,
            &report.idempotency_key,
        )
        .await
    }

    /// Generate report `report_id` unless it is already settled or being
    /// generated elsewhere.
    ///
    /// The stored input snapshot is what gets narrated; `input` is only
    /// compared against it.
    pub async fn handle(
        &self,
        report_id: Uuid,
        report_type: ReportType,
        input: &BirthInput,
        idempotency_key: &str,
    ) -> Result<WorkerOutcome, WorkerError> {
        let worker_id = Uuid::new_v4();

        let claimed = match self
            .claim(report_id, report_type, idempotency_key, worker_id)
            .await?
        {
            Claim::Claimed(claimed) => claimed,
            Claim::Done(outcome) => return Ok(outcome),
        };

        if claimed.value.input != *input {
            warn!(
                report_id = %report_id,
                "worker input differs from the stored snapshot, using the stored input"
            );
        }
        info!(
            report_id = %report_id,
            report_type = %report_type,
            worker_id = %worker_id,
            attempt = claimed.value.attempts,
            "claimed report for generation"
        );
        AuditEvent::new(AuditAction::ReportClaimed, &claimed.value, worker_id.to_string())
            .with_details(json!({ "attempt": claimed.value.attempts }))
            .emit();

        match self.generate_with_heartbeat(claimed, worker_id).await? {
            Generation::Finished { result, current } => {
                self.finish(current, result, worker_id).await
            }
            Generation::LeaseLost(latest) => {
                Ok(WorkerOutcome::new(latest, Disposition::Superseded))
            }
        }
    }

    async fn claim(
        &self,
        report_id: Uuid,
        report_type: ReportType,
        idempotency_key: &str,
        worker_id: Uuid,
    ) -> Result<Claim, WorkerError> {
        let ttl = self.lease_ttl();

        for _ in 0..self.config.max_write_attempts {
            let current = self.load(report_id, idempotency_key).await?;
            if current.value.report_type != report_type {
                return Err(WorkerError::ReportTypeMismatch {
                    report_id,
                    stored: current.value.report_type,
                    requested: report_type,
                });
            }
            if current.value.is_terminal() {
                debug!(
                    report_id = %report_id,
                    status = %current.value.status,
                    "report already settled"
                );
                return Ok(Claim::Done(WorkerOutcome::new(
                    current.value,
                    Disposition::AlreadyTerminal,
                )));
            }

            let now = Timestamp::now();
            let mut next = current.value.clone();
            next.begin_processing(now)?;
            match next.claim(worker_id, ttl, now) {
                Ok(()) => {}
                Err(CoreError::LeaseHeld { owner, expires_at }) => {
                    info!(
                        report_id = %report_id,
                        holder = %owner,
                        expires_at = %expires_at,
                        "report is being generated by another worker"
                    );
                    return Ok(Claim::Done(WorkerOutcome::new(
                        current.value,
                        Disposition::InProgress,
                    )));
                }
                Err(e) => return Err(e.into()),
            }

            match self.store.compare_and_swap(&current.version, next).await {
                Ok(claimed) => return Ok(Claim::Claimed(claimed)),
                Err(e) if e.is_conflict() => {
                    debug!(report_id = %report_id, "claim lost a write race, re-reading");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(WorkerError::Contention {
            report_id,
            attempts: self.config.max_write_attempts,
        })
    }

    /// Run the generator on its own task while renewing the lease.
    ///
    /// A panicking generator is reported as a failed generation. The task is
    /// aborted if this future is dropped, so a disconnected caller does not
    /// leave a generation running against a lease nobody renews.
    async fn generate_with_heartbeat(
        &self,
        claimed: Versioned<StoredReport>,
        worker_id: Uuid,
    ) -> Result<Generation, WorkerError> {
        let generator = Arc::clone(&self.generator);
        let report_type = claimed.value.report_type;
        let input = claimed.value.input.clone();
        let mut task = AbortOnDropHandle::new(tokio::spawn(async move {
            generator.generate(report_type, &input).await
        }));

        let mut current = claimed;
        loop {
            tokio::select! {
                biased;

                joined = &mut task => {
                    let result = match joined {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(e) if e.is_panic() => Err("report generator panicked".to_string()),
                        Err(e) => Err(format!("report generation task failed: {e}")),
                    };
                    return Ok(Generation::Finished { result, current });
                }

                _ = tokio::time::sleep(self.config.heartbeat_interval) => {
                    let renewal = match self.renew(&current, worker_id).await {
                        Ok(renewal) => renewal,
                        Err(e) => {
                            task.abort();
                            return Err(e);
                        }
                    };
                    match renewal {
                        Renewal::Renewed(next) => current = next,
                        Renewal::Lost(latest) => {
                            task.abort();
                            warn!(
                                report_id = %latest.report_id,
                                worker_id = %worker_id,
                                status = %latest.status,
                                "lost generation lease, abandoning generation"
                            );
                            return Ok(Generation::LeaseLost(latest));
                        }
                    }
                }
            }
        }
    }

    async fn renew(
        &self,
        current: &Versioned<StoredReport>,
        worker_id: Uuid,
    ) -> Result<Renewal, WorkerError> {
        let mut next = current.value.clone();
        if next
            .renew_lease(worker_id, self.lease_ttl(), Timestamp::now())
            .is_err()
        {
            return Ok(Renewal::Lost(current.value.clone()));
        }

        match self.store.compare_and_swap(&current.version, next).await {
            Ok(renewed) => {
                debug!(report_id = %renewed.value.report_id, "generation lease renewed");
                Ok(Renewal::Renewed(renewed))
            }
            Err(e) if e.is_conflict() => {
                let latest = self
                    .load(current.value.report_id, &current.value.idempotency_key)
                    .await?;
                if holds_lease(&latest.value, worker_id) {
                    Ok(Renewal::Renewed(latest))
                } else {
                    Ok(Renewal::Lost(latest.value))
                }
            }
            Err(e) => {
                warn!(
                    report_id = %current.value.report_id,
                    error = %e,
                    "lease renewal failed, retrying at next heartbeat"
                );
                Ok(Renewal::Renewed(current.clone()))
            }
        }
    }

    /// Settle the generation result and write the terminal status, provided
    /// this worker still holds the lease.
    async fn finish(
        &self,
        mut current: Versioned<StoredReport>,
        result: Result<GeneratedReport, String>,
        worker_id: Uuid,
    ) -> Result<WorkerOutcome, WorkerError> {
        let report_id = current.value.report_id;
        let (settlement, usage) = match result {
            Ok(generated) => (
                settle(
                    self.validator.as_ref(),
                    current.value.report_type,
                    &current.value.input,
                    generated.content,
                ),
                generated.usage,
            ),
            Err(message) => {
                warn!(report_id = %report_id, error = %message, "report generation failed");
                (Settlement::Rejected { reason: message }, None)
            }
        };

        for _ in 0..self.config.max_write_attempts {
            let now = Timestamp::now();
            let mut next = current.value.clone();
            match &settlement {
                Settlement::Accepted { content, degraded } => {
                    next.complete(content.clone(), *degraded, usage, now)?
                }
                Settlement::Rejected { reason } => {
                    next.fail(ErrorCode::GenerationError, reason.clone(), now)?
                }
            }

            match self.store.compare_and_swap(&current.version, next).await {
                Ok(stored) => {
                    emit_terminal(&stored.value, worker_id);
                    return Ok(WorkerOutcome::new(stored.value, Disposition::Generated));
                }
                Err(e) if e.is_conflict() => {
                    let latest = self.load(report_id, &current.value.idempotency_key).await?;
                    if !holds_lease(&latest.value, worker_id) {
                        info!(
                            report_id = %report_id,
                            worker_id = %worker_id,
                            status = %latest.value.status,
                            "report settled or reclaimed elsewhere, discarding result"
                        );
                        return Ok(WorkerOutcome::new(latest.value, Disposition::Superseded));
                    }
                    current = latest;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(WorkerError::Contention {
            report_id,
            attempts: self.config.max_write_attempts,
        })
    }

    async fn load(
        &self,
        report_id: Uuid,
        idempotency_key: &str,
    ) -> Result<Versioned<StoredReport>, WorkerError> {
        match self.store.get(report_id).await? {
            Some(current) if current.value.idempotency_key == idempotency_key => Ok(current),
            _ => Err(WorkerError::NotFound { report_id }),
        }
    }

    fn lease_ttl(&self) -> SignedDuration {
        SignedDuration::try_from(self.config.lease_ttl).unwrap_or(SignedDuration::MAX)
    }
}

fn holds_lease(report: &StoredReport, worker_id: Uuid) -> bool {
    report.status == ReportStatus::Processing && report.lease.is_some_and(|l| l.owner == worker_id)
}

/// Audit a terminal write. Only called once the write has landed.
fn emit_terminal(report: &StoredReport, worker_id: Uuid) {
    match report.status {
        ReportStatus::Completed => {
            if report.degraded != Degradation::None {
                AuditEvent::new(AuditAction::FallbackApplied, report, worker_id.to_string())
                    .with_degradation(report.degraded)
                    .emit();
            }
            info!(
                report_id = %report.report_id,
                degraded = ?report.degraded,
                "report completed"
            );
            AuditEvent::new(AuditAction::ReportCompleted, report, worker_id.to_string())
                .with_degradation(report.degraded)
                .emit();
        }
        _ => {
            warn!(
                report_id = %report.report_id,
                error_code = ?report.error_code,
                error = report.error_message.as_deref().unwrap_or_default(),
                "report failed"
            );
            AuditEvent::new(AuditAction::ReportFailed, report, worker_id.to_string())
                .with_details(json!({
                    "errorCode": report.error_code,
                    "message": report.error_message,
                }))
                .emit();
        }
    }
}
