use astrosetu_core::error::CoreError;
use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{
    Degradation, ErrorCode, ReportContent, ReportSection, ReportStatus, ReportType, StoredReport,
};
use jiff::{SignedDuration, Timestamp};
use uuid::Uuid;

fn input() -> BirthInput {
    BirthInput::new("Test User", "1990-01-01", "12:00", "Test City")
}

fn processing(now: Timestamp) -> StoredReport {
    StoredReport::new("key-1", ReportType::LifeSummary, input(), ReportStatus::Processing, now)
        .unwrap()
}

fn content() -> ReportContent {
    ReportContent {
        title: "Life Summary".to_string(),
        summary: "A summary.".to_string(),
        sections: vec![ReportSection::new("Nature", "Calm and steady.")],
    }
}

#[test]
fn new_record_rejects_terminal_initial_status() {
    let now = Timestamp::now();
    let err = StoredReport::new("k", ReportType::FullLife, input(), ReportStatus::Completed, now)
        .unwrap_err();
    assert!(matches!(err, CoreError::IllegalTransition { .. }));
}

#[test]
fn pending_moves_to_processing_once() {
    let now = Timestamp::now();
    let mut report =
        StoredReport::new("k", ReportType::FullLife, input(), ReportStatus::Pending, now).unwrap();
    report.begin_processing(now).unwrap();
    assert_eq!(report.status, ReportStatus::Processing);
    // Already processing is not an error.
    report.begin_processing(now).unwrap();
    assert_eq!(report.status, ReportStatus::Processing);
}

#[test]
fn completing_sets_content_and_clears_errors() {
    let now = Timestamp::now();
    let mut report = processing(now);
    report.claim(Uuid::new_v4(), SignedDuration::from_secs(60), now).unwrap();
    report.complete(content(), Degradation::None, None, now).unwrap();

    assert_eq!(report.status, ReportStatus::Completed);
    assert!(report.content.is_some());
    assert!(report.error_message.is_none());
    assert!(report.lease.is_none());
}

#[test]
fn failing_sets_message_and_no_content() {
    let now = Timestamp::now();
    let mut report = processing(now);
    report.fail(ErrorCode::GenerationError, "model timed out", now).unwrap();

    assert_eq!(report.status, ReportStatus::Failed);
    assert!(report.content.is_none());
    assert_eq!(report.error_code, Some(ErrorCode::GenerationError));
    assert_eq!(report.error_message.as_deref(), Some("model timed out"));
}

#[test]
fn terminal_records_never_transition_again() {
    let now = Timestamp::now();
    let mut report = processing(now);
    report.complete(content(), Degradation::None, None, now).unwrap();

    assert!(report.fail(ErrorCode::GenerationError, "late", now).is_err());
    assert!(report.complete(content(), Degradation::Fallback, None, now).is_err());
    assert!(report.begin_processing(now).is_err());
    assert!(
        report
            .claim(Uuid::new_v4(), SignedDuration::from_secs(60), now)
            .is_err()
    );
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.degraded, Degradation::None);
}

#[test]
fn pending_cannot_jump_to_terminal() {
    let now = Timestamp::now();
    let mut report =
        StoredReport::new("k", ReportType::FullLife, input(), ReportStatus::Pending, now).unwrap();
    let err = report.complete(content(), Degradation::None, None, now).unwrap_err();
    assert!(matches!(
        err,
        CoreError::IllegalTransition {
            from: ReportStatus::Pending,
            to: ReportStatus::Completed
        }
    ));
}

#[test]
fn live_lease_blocks_other_owners() {
    let now = Timestamp::now();
    let mut report = processing(now);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    report.claim(first, SignedDuration::from_secs(60), now).unwrap();
    let err = report
        .claim(second, SignedDuration::from_secs(60), now)
        .unwrap_err();
    assert!(matches!(err, CoreError::LeaseHeld { owner, .. } if owner == first));
    assert_eq!(report.attempts, 1);
}

#[test]
fn expired_lease_can_be_reclaimed() {
    let now = Timestamp::now();
    let mut report = processing(now);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    report.claim(first, SignedDuration::from_secs(10), now).unwrap();
    let later = now.checked_add(SignedDuration::from_secs(11)).unwrap();
    report.claim(second, SignedDuration::from_secs(10), later).unwrap();

    assert_eq!(report.lease.map(|l| l.owner), Some(second));
    assert_eq!(report.attempts, 2);
}

#[test]
fn renewal_requires_holding_the_lease() {
    let now = Timestamp::now();
    let mut report = processing(now);
    let owner = Uuid::new_v4();

    assert!(matches!(
        report.renew_lease(owner, SignedDuration::from_secs(10), now),
        Err(CoreError::LeaseLost { .. })
    ));

    report.claim(owner, SignedDuration::from_secs(10), now).unwrap();
    let later = now.checked_add(SignedDuration::from_secs(5)).unwrap();
    report.renew_lease(owner, SignedDuration::from_secs(10), later).unwrap();
    assert_eq!(
        report.lease.map(|l| l.expires_at),
        later.checked_add(SignedDuration::from_secs(10)).ok()
    );
}

#[test]
fn report_type_round_trips_through_its_wire_name() {
    for report_type in ReportType::ALL {
        let parsed: ReportType = report_type.as_str().parse().unwrap();
        assert_eq!(parsed, report_type);
        let json = serde_json::to_string(&report_type).unwrap();
        assert_eq!(json, format!("\"{}\"", report_type.as_str()));
    }
    assert!("weekly-horoscope".parse::<ReportType>().is_err());
}
