//! Drives one report request from `start` to a terminal state.
//!
//! State is published through a `tokio::sync::watch` channel. Each `start`
//! opens a new attempt with its own cancellation token and start-time cell;
//! a poll task only writes state while its attempt is still the current one,
//! so responses from a cancelled or replaced attempt are dropped.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use astrosetu_core::models::api::{ReportStatusResponse, StartReportRequest};
use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{ReportContent, ReportStatus, ReportType};
use astrosetu_core::policy;

use crate::api::ReportApi;
use crate::elapsed;
use crate::error::ClientError;

pub const TAKING_TOO_LONG: &str =
    "Report generation is taking longer than expected. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerStatus {
    #[default]
    Idle,
    Starting,
    Polling,
    Completed,
    Failed,
    /// Reported to waiters of an attempt that was cancelled. The published
    /// state itself returns to `Idle`.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerError {
    pub message: String,
    /// Whether offering a retry makes sense.
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    pub status: ControllerStatus,
    /// Incremented by every `start`; `0` before the first.
    pub attempt: u64,
    pub report_id: Option<Uuid>,
    /// Mirror of the attempt's start-time cell while polling.
    pub start_time: Option<Timestamp>,
    pub report_content: Option<ReportContent>,
    pub error: Option<ControllerError>,
}

impl ControllerState {
    pub fn is_running(&self) -> bool {
        matches!(
            self.status,
            ControllerStatus::Starting | ControllerStatus::Polling
        )
    }
}

/// Poll cadence and failure tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Status polls before surfacing a "taking too long" failure.
    pub max_polls: u32,
    /// Consecutive transient poll failures before surfacing `Failed`.
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: policy::POLL_INTERVAL,
            max_polls: policy::MAX_POLLS,
            max_consecutive_failures: policy::MAX_CONSECUTIVE_POLL_FAILURES,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures.max(1);
        self
    }
}

struct ActiveAttempt {
    cancel: CancellationToken,
    anchor: Arc<OnceLock<Timestamp>>,
}

pub struct GenerationController {
    api: Arc<dyn ReportApi>,
    config: PollConfig,
    state: Arc<watch::Sender<ControllerState>>,
    active: Mutex<Option<ActiveAttempt>>,
}

impl GenerationController {
    pub fn new(api: Arc<dyn ReportApi>) -> Self {
        Self::with_config(api, PollConfig::default())
    }

    pub fn with_config(api: Arc<dyn ReportApi>, config: PollConfig) -> Self {
        let (state, _) = watch::channel(ControllerState::default());
        Self {
            api,
            config,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Begin a new attempt. Must be called inside a tokio runtime.
    ///
    /// Allowed from any state except `Starting` and `Polling`, which return
    /// [`ClientError::Busy`]. Returns the new attempt number.
    pub fn start(&self, input: BirthInput, report_type: ReportType) -> Result<u64, ClientError> {
        let mut active = lock(&self.active);
        if self.state.borrow().is_running() {
            return Err(ClientError::Busy);
        }

        let cancel = CancellationToken::new();
        let anchor = Arc::new(OnceLock::new());
        let previous = active.replace(ActiveAttempt {
            cancel: cancel.clone(),
            anchor: Arc::clone(&anchor),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let mut attempt = 0;
        self.state.send_modify(|s| {
            attempt = s.attempt + 1;
            *s = ControllerState {
                status: ControllerStatus::Starting,
                attempt,
                ..ControllerState::default()
            };
        });
        drop(active);

        info!(attempt, report_type = %report_type, "starting report generation");
        let task = AttemptTask {
            api: Arc::clone(&self.api),
            config: self.config,
            state: Arc::clone(&self.state),
            attempt,
            cancel,
            anchor,
            request: StartReportRequest {
                report_type,
                input,
                idempotency_key: Some(Uuid::new_v4().to_string()),
            },
        };
        tokio::spawn(task.run());
        Ok(attempt)
    }

    /// Stop the current attempt and return to `Idle`.
    ///
    /// Clears every per-attempt guard, so `start` works again immediately.
    pub fn cancel(&self) {
        let mut active = lock(&self.active);
        if let Some(attempt) = active.take() {
            attempt.cancel.cancel();
        }
        self.state.send_modify(|s| {
            let attempt = s.attempt;
            if s.is_running() {
                debug!(attempt, "report generation cancelled");
            }
            *s = ControllerState {
                attempt,
                ..ControllerState::default()
            };
        });
    }

    /// Resolve when the current attempt settles.
    ///
    /// Returns the terminal state, or a snapshot with status `Cancelled` if
    /// the attempt was cancelled or replaced first (or none was started).
    pub async fn wait_for_outcome(&self) -> ControllerState {
        let mut rx = self.state.subscribe();
        let attempt = rx.borrow().attempt;
        let settled = rx
            .wait_for(|s| s.attempt != attempt || !s.is_running())
            .await
            .map(|s| (*s).clone());

        match settled {
            Ok(s)
                if s.attempt == attempt
                    && matches!(
                        s.status,
                        ControllerStatus::Completed | ControllerStatus::Failed
                    ) =>
            {
                s
            }
            _ => ControllerState {
                status: ControllerStatus::Cancelled,
                attempt,
                ..ControllerState::default()
            },
        }
    }

    /// The current attempt's start time.
    ///
    /// Read from the attempt's own cell rather than the published mirror, so
    /// it is available as soon as it is recorded.
    pub fn start_time(&self) -> Option<Timestamp> {
        if !self.state.borrow().is_running() {
            return None;
        }
        lock(&self.active)
            .as_ref()
            .and_then(|a| a.anchor.get().copied())
    }

    pub fn elapsed_seconds(&self, now: Timestamp) -> u64 {
        let running = self.state.borrow().is_running();
        elapsed::elapsed_seconds(self.start_time(), running, now)
    }
}

impl Drop for GenerationController {
    fn drop(&mut self) {
        if let Some(attempt) = lock(&self.active).take() {
            attempt.cancel.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct AttemptTask {
    api: Arc<dyn ReportApi>,
    config: PollConfig,
    state: Arc<watch::Sender<ControllerState>>,
    attempt: u64,
    cancel: CancellationToken,
    anchor: Arc<OnceLock<Timestamp>>,
    request: StartReportRequest,
}

impl AttemptTask {
    async fn run(self) {
        let started = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            result = self.api.start(&self.request) => result,
        };
        let response = match started {
            Ok(response) => response,
            Err(e) => {
                warn!(attempt = self.attempt, error = %e, "report start request failed");
                self.fail(e.to_string(), e.is_retryable());
                return;
            }
        };
        let report_id = response.report_id;
        if !self.apply(response) {
            return;
        }

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut polls = 0;
        let mut failures = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            if polls >= self.config.max_polls {
                warn!(
                    attempt = self.attempt,
                    report_id = %report_id,
                    polls,
                    "poll ceiling reached"
                );
                self.fail(TAKING_TOO_LONG.to_string(), true);
                return;
            }
            polls += 1;

            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                result = self.api.status(report_id) => result,
            };
            match polled {
                Ok(response) => {
                    failures = 0;
                    if !self.apply(response) {
                        return;
                    }
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    warn!(
                        attempt = self.attempt,
                        report_id = %report_id,
                        failures,
                        error = %e,
                        "report status poll failed"
                    );
                    if failures >= self.config.max_consecutive_failures {
                        self.fail(e.to_string(), true);
                        return;
                    }
                }
                Err(e) => {
                    warn!(
                        attempt = self.attempt,
                        report_id = %report_id,
                        error = %e,
                        "report status poll rejected"
                    );
                    self.fail(e.to_string(), e.is_retryable());
                    return;
                }
            }
        }
    }

    /// Reflect one server response. Returns whether to keep polling.
    fn apply(&self, response: ReportStatusResponse) -> bool {
        let report_id = response.report_id;
        match response.status {
            ReportStatus::Pending | ReportStatus::Processing => {
                let start_time = *self.anchor.get_or_init(Timestamp::now);
                self.publish(|s| {
                    s.status = ControllerStatus::Polling;
                    s.report_id = Some(report_id);
                    s.start_time = Some(start_time);
                })
            }
            ReportStatus::Completed => {
                let Some(content) = response.content else {
                    self.fail("completed report has no content".to_string(), true);
                    return false;
                };
                info!(attempt = self.attempt, report_id = %report_id, "report completed");
                self.publish(|s| {
                    s.status = ControllerStatus::Completed;
                    s.report_id = Some(report_id);
                    s.report_content = Some(content);
                    s.start_time = None;
                    s.error = None;
                });
                false
            }
            ReportStatus::Failed => {
                let message = response
                    .error_message
                    .unwrap_or_else(|| "Report generation failed.".to_string());
                info!(
                    attempt = self.attempt,
                    report_id = %report_id,
                    error = %message,
                    "report failed"
                );
                self.publish(|s| {
                    s.report_id = Some(report_id);
                    fail_in_place(s, message, true);
                });
                false
            }
        }
    }

    fn fail(&self, message: String, retryable: bool) {
        self.publish(|s| fail_in_place(s, message, retryable));
    }

    /// Apply `update` if this attempt is still current. Watchers are only
    /// notified when something changed.
    fn publish(&self, update: impl FnOnce(&mut ControllerState)) -> bool {
        let mut current = false;
        self.state.send_if_modified(|s| {
            if s.attempt != self.attempt || self.cancel.is_cancelled() {
                return false;
            }
            current = true;
            let before = s.clone();
            update(s);
            *s != before
        });
        current
    }
}

fn fail_in_place(state: &mut ControllerState, message: String, retryable: bool) {
    state.status = ControllerStatus::Failed;
    state.start_time = None;
    state.report_content = None;
    state.error = Some(ControllerError { message, retryable });
}
