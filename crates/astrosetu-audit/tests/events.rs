use astrosetu_audit::events::{AuditAction, AuditEvent};
use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{Degradation, ReportStatus, ReportType, StoredReport};

fn report() -> StoredReport {
    StoredReport::new(
        "key",
        ReportType::YearAnalysis,
        BirthInput::new("Test User", "1990-01-01", "12:00", "Test City"),
        ReportStatus::Processing,
        jiff::Timestamp::now(),
    )
    .unwrap()
}

#[test]
fn event_captures_report_identity() {
    let report = report();
    let event = AuditEvent::new(AuditAction::ReportCreated, &report, "api");
    assert_eq!(event.report_id, report.report_id.to_string());
    assert_eq!(event.report_type, "year-analysis");
    assert_eq!(event.status, "processing");
    assert!(event.details.is_none());
    event.emit();
}

#[test]
fn degradation_only_recorded_when_present() {
    let report = report();
    let plain = AuditEvent::new(AuditAction::ReportCompleted, &report, "w")
        .with_degradation(Degradation::None);
    assert!(plain.details.is_none());

    let degraded = AuditEvent::new(AuditAction::ReportCompleted, &report, "w")
        .with_degradation(Degradation::AcceptedUnderLength);
    assert_eq!(
        degraded.details.unwrap()["degraded"],
        serde_json::json!("accepted-under-length")
    );
}

#[test]
fn actions_serialize_to_dotted_names() {
    let json = serde_json::to_value(AuditAction::FallbackApplied).unwrap();
    assert_eq!(json, serde_json::json!("report.fallback_applied"));
    assert_eq!(AuditAction::ReportFailed.as_str(), "report.failed");
}
