use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use astrosetu_bedrock::error::BedrockError;
use astrosetu_bedrock::generator::{GeneratedReport, ReportGenerator};
use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{ReportContent, ReportSection, ReportStatus, ReportType};
use astrosetu_lambda::config::DispatchMode;
use astrosetu_lambda::router;
use astrosetu_lambda::state::AppState;
use astrosetu_storage::memory::MemoryReportStore;
use astrosetu_storage::store::ReportStore;
use astrosetu_worker::worker::ReportWorker;

struct FakeGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeGenerator {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportGenerator for FakeGenerator {
    async fn generate(
        &self,
        report_type: ReportType,
        input: &BirthInput,
    ) -> Result<GeneratedReport, BedrockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BedrockError::Invocation("model unavailable".to_string()));
        }
        Ok(ReportContent {
            title: format!("{} for {}", report_type.display_name(), input.name),
            summary: "Generated summary.".to_string(),
            sections: report_type
                .outline()
                .iter()
                .map(|h| {
                    ReportSection::new(*h, "Generated narration for this section. ".repeat(20))
                })
                .collect(),
        }
        .into())
    }
}

fn app(dispatch: DispatchMode, generator: Arc<FakeGenerator>) -> (Router, Arc<MemoryReportStore>) {
    let store = Arc::new(MemoryReportStore::new());
    let worker = ReportWorker::new(store.clone(), generator);
    (router(AppState::new(worker, dispatch)), store)
}

fn input() -> Value {
    json!({
        "name": "Test User",
        "dob": "1990-01-01",
        "tob": "12:00",
        "place": "Test City"
    })
}

fn start_body(report_type: &str, key: Option<&str>) -> Value {
    let mut body = json!({ "reportType": report_type, "input": input() });
    if let Some(key) = key {
        body["idempotencyKey"] = json!(key);
    }
    body
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn status_uri(report_id: &Value) -> String {
    format!(
        "/report-generation-status?reportId={}",
        report_id.as_str().unwrap()
    )
}

fn worker_body(store_report: &Value) -> Value {
    json!({
        "reportId": store_report["reportId"],
        "reportType": store_report["reportType"],
        "input": store_report["input"],
        "idempotencyKey": store_report["idempotencyKey"],
    })
}

#[tokio::test]
async fn health_check_responds() {
    let (app, _) = app(DispatchMode::External, FakeGenerator::ok());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn inline_start_completes_and_is_idempotent() {
    let generator = FakeGenerator::ok();
    let (app, store) = app(DispatchMode::Inline, generator.clone());
    let body = start_body("life-summary", Some("order-1"));

    let (status, first) = send(&app, post_json("/report-generation-start", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "completed");
    assert_eq!(first["content"]["title"], "Life Summary for Test User");

    let (_, second) = send(&app, post_json("/report-generation-start", &body)).await;
    assert_eq!(second["reportId"], first["reportId"]);
    assert_eq!(second["status"], "completed");
    assert_eq!(generator.calls(), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn derived_key_deduplicates_identical_requests() {
    let (app, store) = app(DispatchMode::OnPoll, FakeGenerator::ok());
    let body = start_body("career-money", None);

    let (_, first) = send(&app, post_json("/report-generation-start", &body)).await;
    let (_, second) = send(&app, post_json("/report-generation-start", &body)).await;

    assert_eq!(first["reportId"], second["reportId"]);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn invalid_input_is_bad_request() {
    let (app, store) = app(DispatchMode::Inline, FakeGenerator::ok());
    let mut body = start_body("life-summary", None);
    body["input"]["name"] = json!("  ");

    let (status, body) = send(&app, post_json("/report-generation-start", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn unknown_report_type_is_bad_request() {
    let (app, _) = app(DispatchMode::Inline, FakeGenerator::ok());
    let body = start_body("horoscope-of-the-day", None);

    let (status, _) = send(&app, post_json("/report-generation-start", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reused_key_with_other_report_type_is_rejected() {
    let (app, _) = app(DispatchMode::External, FakeGenerator::ok());
    send(
        &app,
        post_json("/report-generation-start", &start_body("life-summary", Some("k"))),
    )
    .await;

    let (status, _) = send(
        &app,
        post_json("/report-generation-start", &start_body("full-life", Some("k"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_of_unknown_report_is_not_found() {
    let (app, _) = app(DispatchMode::OnPoll, FakeGenerator::ok());

    let uri = format!("/report-generation-status?reportId={}", Uuid::new_v4());
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], "NOT_FOUND");

    let (status, _) = send(&app, get("/report-generation-status?reportId=nope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/report-generation-status")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn on_poll_dispatch_generates_during_status_poll() {
    let generator = FakeGenerator::ok();
    let (app, _) = app(DispatchMode::OnPoll, generator.clone());

    let (_, started) = send(
        &app,
        post_json("/report-generation-start", &start_body("year-analysis", None)),
    )
    .await;
    assert_eq!(started["status"], "processing");
    assert_eq!(generator.calls(), 0);

    let (status, polled) = send(&app, get(&status_uri(&started["reportId"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(polled["status"], "completed");

    send(&app, get(&status_uri(&started["reportId"]))).await;
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn background_dispatch_completes_after_response() {
    let (app, store) = app(DispatchMode::Background, FakeGenerator::ok());

    let (_, started) = send(
        &app,
        post_json("/report-generation-start", &start_body("marriage-timing", None)),
    )
    .await;
    let report_id: Uuid = started["reportId"].as_str().unwrap().parse().unwrap();

    let mut settled = None;
    for _ in 0..100 {
        let current = store.get(report_id).await.unwrap().unwrap().value;
        if current.is_terminal() {
            settled = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(settled.map(|r| r.status), Some(ReportStatus::Completed));
}

#[tokio::test]
async fn external_worker_settles_pending_report() {
    let generator = FakeGenerator::ok();
    let (app, _) = app(DispatchMode::External, generator.clone());

    let (_, started) = send(
        &app,
        post_json("/report-generation-start", &start_body("decision-support", None)),
    )
    .await;
    assert_eq!(started["status"], "pending");

    let (_, record) = send(
        &app,
        get(&format!("/reports/{}", started["reportId"].as_str().unwrap())),
    )
    .await;

    let (status, worked) = send(&app, post_json("/report-worker", &worker_body(&record))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(worked["ok"], true);
    assert_eq!(worked["status"], "completed");

    let (status, again) = send(&app, post_json("/report-worker", &worker_body(&record))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["content"], worked["content"]);
    assert_eq!(generator.calls(), 1);

    let (_, polled) = send(&app, get(&status_uri(&started["reportId"]))).await;
    assert_eq!(polled["status"], "completed");
}

#[tokio::test]
async fn worker_failure_is_server_error() {
    let (app, _) = app(DispatchMode::External, FakeGenerator::failing());

    let (_, started) = send(
        &app,
        post_json("/report-generation-start", &start_body("full-life", None)),
    )
    .await;
    let (_, record) = send(
        &app,
        get(&format!("/reports/{}", started["reportId"].as_str().unwrap())),
    )
    .await;

    let (status, worked) = send(&app, post_json("/report-worker", &worker_body(&record))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(worked["ok"], false);
    assert_eq!(worked["status"], "failed");
    assert_eq!(worked["error"]["code"], "GENERATION_ERROR");

    let (status, again) = send(&app, post_json("/report-worker", &worker_body(&record))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "failed");

    let (_, polled) = send(&app, get(&status_uri(&started["reportId"]))).await;
    assert_eq!(polled["errorCode"], "GENERATION_ERROR");
    assert!(polled["errorMessage"].as_str().unwrap().contains("model unavailable"));
}

#[tokio::test]
async fn worker_for_unknown_report_is_not_found() {
    let (app, _) = app(DispatchMode::External, FakeGenerator::ok());
    let body = json!({
        "reportId": Uuid::new_v4(),
        "reportType": "life-summary",
        "input": input(),
        "idempotencyKey": "missing",
    });

    let (status, _) = send(&app, post_json("/report-worker", &body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn worker_with_wrong_report_type_is_bad_request() {
    let (app, _) = app(DispatchMode::External, FakeGenerator::ok());
    let (_, started) = send(
        &app,
        post_json("/report-generation-start", &start_body("life-summary", None)),
    )
    .await;
    let (_, record) = send(
        &app,
        get(&format!("/reports/{}", started["reportId"].as_str().unwrap())),
    )
    .await;

    let mut body = worker_body(&record);
    body["reportType"] = json!("full-life");
    let (status, _) = send(&app, post_json("/report-worker", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
