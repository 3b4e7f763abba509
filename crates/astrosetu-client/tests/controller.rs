use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use astrosetu_client::api::ReportApi;
use astrosetu_client::controller::{
    ControllerStatus, GenerationController, PollConfig, TAKING_TOO_LONG,
};
use astrosetu_client::error::ClientError;
use astrosetu_core::models::api::{ReportStatusResponse, StartReportRequest};
use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{ReportContent, ReportSection, ReportStatus, ReportType};

type Reply = Result<ReportStatusResponse, ClientError>;
type Script = Box<dyn Fn(usize, Uuid) -> Reply + Send + Sync>;

/// Replies chosen by call number.
struct ScriptedApi {
    report_id: Uuid,
    on_start: Script,
    on_status: Script,
    status_delay: Duration,
    starts: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedApi {
    fn new(
        on_start: impl Fn(usize, Uuid) -> Reply + Send + Sync + 'static,
        on_status: impl Fn(usize, Uuid) -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            on_start: Box::new(on_start),
            on_status: Box::new(on_status),
            status_delay: Duration::ZERO,
            starts: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportApi for ScriptedApi {
    async fn start(&self, _request: &StartReportRequest) -> Reply {
        let n = self.starts.fetch_add(1, Ordering::SeqCst);
        (self.on_start)(n, self.report_id)
    }

    async fn status(&self, report_id: Uuid) -> Reply {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.status_delay).await;
        (self.on_status)(n, report_id)
    }
}

fn input() -> BirthInput {
    BirthInput::new("Test User", "1990-01-01", "12:00", "Test City")
}

fn content() -> ReportContent {
    ReportContent {
        title: "Year Analysis for Test User".to_string(),
        summary: "A steady year.".to_string(),
        sections: vec![ReportSection::new("Year Overview", "Consolidation.")],
    }
}

fn processing(report_id: Uuid) -> Reply {
    Ok(ReportStatusResponse {
        status: ReportStatus::Processing,
        report_id,
        content: None,
        error_code: None,
        error_message: None,
    })
}

fn completed(report_id: Uuid) -> Reply {
    Ok(ReportStatusResponse {
        status: ReportStatus::Completed,
        report_id,
        content: Some(content()),
        error_code: None,
        error_message: None,
    })
}

fn transport_error() -> Reply {
    Err(ClientError::Transport("connection reset".to_string()))
}

fn controller(api: &Arc<ScriptedApi>) -> GenerationController {
    let config = PollConfig::default()
        .with_interval(Duration::from_secs(2))
        .with_max_polls(10);
    GenerationController::with_config(api.clone(), config)
}

#[tokio::test(start_paused = true)]
async fn polls_until_completed() {
    let api = Arc::new(ScriptedApi::new(
        |_, id| processing(id),
        |n, id| if n < 2 { processing(id) } else { completed(id) },
    ));
    let controller = controller(&api);

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Completed);
    assert_eq!(outcome.report_id, Some(api.report_id));
    assert_eq!(outcome.report_content, Some(content()));
    assert_eq!(outcome.start_time, None);
    assert_eq!(api.polls(), 3);
    assert_eq!(controller.start_time(), None);
}

#[tokio::test(start_paused = true)]
async fn completed_start_skips_polling() {
    let api = Arc::new(ScriptedApi::new(|_, id| completed(id), |_, id| processing(id)));
    let controller = controller(&api);

    controller.start(input(), ReportType::LifeSummary).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Completed);
    assert_eq!(api.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_transport_failure_fails_immediately() {
    let api = Arc::new(ScriptedApi::new(|_, _| transport_error(), |_, id| processing(id)));
    let controller = controller(&api);

    controller.start(input(), ReportType::LifeSummary).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Failed);
    let error = outcome.error.unwrap();
    assert!(error.retryable);
    assert!(error.message.contains("connection reset"));
    assert_eq!(api.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn server_failure_is_surfaced() {
    let api = Arc::new(ScriptedApi::new(
        |_, id| processing(id),
        |_, id| {
            Ok(ReportStatusResponse {
                status: ReportStatus::Failed,
                report_id: id,
                content: None,
                error_code: None,
                error_message: Some("report content failed validation".to_string()),
            })
        },
    ));
    let controller = controller(&api);

    controller.start(input(), ReportType::FullLife).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Failed);
    assert_eq!(outcome.report_id, Some(api.report_id));
    assert_eq!(
        outcome.error.unwrap().message,
        "report content failed validation"
    );
}

#[tokio::test(start_paused = true)]
async fn transient_poll_failures_are_tolerated() {
    let api = Arc::new(ScriptedApi::new(
        |_, id| processing(id),
        |n, id| if n < 2 { transport_error() } else { completed(id) },
    ));
    let controller = controller(&api);

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Completed);
    assert_eq!(api.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn consecutive_poll_failures_fail_the_attempt() {
    let api = Arc::new(ScriptedApi::new(|_, id| processing(id), |_, _| transport_error()));
    let controller = controller(&api);

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Failed);
    assert!(outcome.error.unwrap().retryable);
    assert_eq!(api.polls(), 3);
}

#[tokio::test(start_paused = true)]
async fn unparsable_poll_response_fails_immediately() {
    let api = Arc::new(ScriptedApi::new(
        |_, id| processing(id),
        |_, _| Err(ClientError::InvalidResponse("expected value".to_string())),
    ));
    let controller = controller(&api);

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Failed);
    assert_eq!(api.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_ceiling_reports_taking_too_long() {
    let api = Arc::new(ScriptedApi::new(|_, id| processing(id), |_, id| processing(id)));
    let controller = controller(&api);

    controller.start(input(), ReportType::FullLife).unwrap();
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Failed);
    let error = outcome.error.unwrap();
    assert_eq!(error.message, TAKING_TOO_LONG);
    assert!(error.retryable);
    assert_eq!(api.polls(), 10);
}

#[tokio::test(start_paused = true)]
async fn second_start_while_running_is_busy() {
    let api = Arc::new(ScriptedApi::new(|_, id| processing(id), |_, id| processing(id)));
    let controller = controller(&api);

    controller.start(input(), ReportType::LifeSummary).unwrap();
    let err = controller
        .start(input(), ReportType::LifeSummary)
        .unwrap_err();

    assert!(matches!(err, ClientError::Busy));
}

#[tokio::test(start_paused = true)]
async fn start_time_is_anchored_once_per_attempt() {
    let api = Arc::new(ScriptedApi::new(|_, id| processing(id), |_, id| processing(id)));
    let controller = controller(&api);
    let mut rx = controller.subscribe();

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    let anchored = rx
        .wait_for(|s| s.status == ControllerStatus::Polling)
        .await
        .unwrap()
        .start_time;
    assert!(anchored.is_some());
    assert_eq!(controller.start_time(), anchored);

    tokio::time::sleep(Duration::from_secs(9)).await;

    assert!(api.polls() >= 4);
    let state = controller.state();
    assert_eq!(state.status, ControllerStatus::Polling);
    assert_eq!(state.start_time, anchored);
    assert_eq!(controller.start_time(), anchored);
    controller.cancel();
}

#[tokio::test(start_paused = true)]
async fn retry_after_cancel_reaches_completed() {
    let api = Arc::new(ScriptedApi::new(
        |n, id| if n == 0 { processing(id) } else { completed(id) },
        |_, id| processing(id),
    ));
    let controller = controller(&api);
    let mut rx = controller.subscribe();

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    rx.wait_for(|s| s.status == ControllerStatus::Polling)
        .await
        .unwrap();

    controller.cancel();
    assert_eq!(controller.state().status, ControllerStatus::Idle);
    assert_eq!(controller.start_time(), None);

    let attempt = controller.start(input(), ReportType::YearAnalysis).unwrap();
    assert_eq!(attempt, 2);
    let outcome = controller.wait_for_outcome().await;

    assert_eq!(outcome.status, ControllerStatus::Completed);
    assert_eq!(outcome.attempt, 2);
}

#[tokio::test(start_paused = true)]
async fn waiters_on_cancelled_attempt_see_cancelled() {
    let api = Arc::new(ScriptedApi::new(|_, id| processing(id), |_, id| processing(id)));
    let controller = Arc::new(controller(&api));

    controller.start(input(), ReportType::LifeSummary).unwrap();
    let waiter = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.wait_for_outcome().await })
    };
    tokio::time::sleep(Duration::from_secs(3)).await;

    controller.cancel();
    let outcome = waiter.await.unwrap();

    assert_eq!(outcome.status, ControllerStatus::Cancelled);
    assert_eq!(outcome.attempt, 1);
    assert_eq!(controller.state().status, ControllerStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn stale_response_does_not_overwrite_new_attempt() {
    let api = Arc::new(
        ScriptedApi::new(
            |n, id| if n == 0 { processing(id) } else { completed(id) },
            |_, id| completed(id),
        )
        .with_status_delay(Duration::from_secs(30)),
    );
    let controller = controller(&api);
    let mut rx = controller.subscribe();

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    rx.wait_for(|s| s.status == ControllerStatus::Polling)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(api.polls(), 1);
    controller.cancel();

    controller.start(input(), ReportType::YearAnalysis).unwrap();
    let second = controller.wait_for_outcome().await;
    assert_eq!(second.attempt, 2);

    tokio::time::sleep(Duration::from_secs(60)).await;
    let state = controller.state();
    assert_eq!(state.attempt, 2);
    assert_eq!(state.status, ControllerStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn wait_without_attempt_is_cancelled() {
    let api = Arc::new(ScriptedApi::new(|_, id| processing(id), |_, id| processing(id)));
    let controller = controller(&api);

    let outcome = controller.wait_for_outcome().await;
    assert_eq!(outcome.status, ControllerStatus::Cancelled);
    assert_eq!(outcome.attempt, 0);
}
