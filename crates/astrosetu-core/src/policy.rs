//! Policy constants for report validation, polling and generation leases.
//!
//! These are product decisions rather than derived values. Changing them
//! changes which generated reports are accepted as-is.

use std::time::Duration;

use crate::models::report::ReportType;

/// Minimum shape a generated report must have to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRequirements {
    pub min_sections: usize,
    /// Summed over all section bodies, whitespace-trimmed.
    pub min_body_chars: usize,
}

/// Shortest body a single section may have.
pub const MIN_SECTION_BODY_CHARS: usize = 80;

pub fn requirements(report_type: ReportType) -> ContentRequirements {
    let (min_sections, min_body_chars) = match report_type {
        ReportType::LifeSummary => (3, 1_200),
        ReportType::MarriageTiming => (3, 1_000),
        ReportType::CareerMoney => (3, 1_000),
        ReportType::FullLife => (6, 3_000),
        ReportType::YearAnalysis => (4, 1_500),
        ReportType::MajorLifePhase => (3, 1_200),
        ReportType::DecisionSupport => (2, 800),
    };
    ContentRequirements {
        min_sections,
        min_body_chars,
    }
}

/// Report types that accept under-length fallback content rather than fail.
pub fn accepts_under_length(report_type: ReportType) -> bool {
    matches!(report_type, ReportType::YearAnalysis)
}

/// Client poll cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls before the client gives up (five minutes at the default cadence).
pub const MAX_POLLS: u32 = 150;

/// Consecutive poll transport failures tolerated before surfacing `failed`.
pub const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 3;

/// How long a worker's claim on a record survives without a heartbeat.
pub const LEASE_TTL: Duration = Duration::from_secs(120);

/// How often a generating worker renews its lease.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
