use std::fmt;
use std::str::FromStr;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::birth::BirthInput;
use super::usage::TokenUsage;
use crate::error::CoreError;

/// The kinds of report a user can purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum ReportType {
    LifeSummary,
    MarriageTiming,
    CareerMoney,
    FullLife,
    YearAnalysis,
    MajorLifePhase,
    DecisionSupport,
}

impl ReportType {
    pub const ALL: [ReportType; 7] = [
        ReportType::LifeSummary,
        ReportType::MarriageTiming,
        ReportType::CareerMoney,
        ReportType::FullLife,
        ReportType::YearAnalysis,
        ReportType::MajorLifePhase,
        ReportType::DecisionSupport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::LifeSummary => "life-summary",
            ReportType::MarriageTiming => "marriage-timing",
            ReportType::CareerMoney => "career-money",
            ReportType::FullLife => "full-life",
            ReportType::YearAnalysis => "year-analysis",
            ReportType::MajorLifePhase => "major-life-phase",
            ReportType::DecisionSupport => "decision-support",
        }
    }

    /// Human-readable title used in prompts and fallback content.
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportType::LifeSummary => "Life Summary",
            ReportType::MarriageTiming => "Marriage Timing",
            ReportType::CareerMoney => "Career & Money",
            ReportType::FullLife => "Full Life Report",
            ReportType::YearAnalysis => "Year Analysis",
            ReportType::MajorLifePhase => "Major Life Phase",
            ReportType::DecisionSupport => "Decision Support",
        }
    }

    /// Section headings every report of this type is expected to cover,
    /// in reading order.
    pub fn outline(&self) -> &'static [&'static str] {
        match self {
            ReportType::LifeSummary => &[
                "Personality & Temperament",
                "Strengths",
                "Challenges",
                "Life Themes",
            ],
            ReportType::MarriageTiming => &[
                "Relationship Outlook",
                "Favourable Periods",
                "Partner Qualities",
                "Guidance",
            ],
            ReportType::CareerMoney => &[
                "Career Direction",
                "Wealth Patterns",
                "Favourable Periods",
                "Guidance",
            ],
            ReportType::FullLife => &[
                "Personality",
                "Career",
                "Finances",
                "Relationships",
                "Health",
                "Spiritual Growth",
                "Timeline",
            ],
            ReportType::YearAnalysis => &[
                "Year Overview",
                "First Quarter",
                "Second Quarter",
                "Third Quarter",
                "Fourth Quarter",
            ],
            ReportType::MajorLifePhase => &[
                "Current Phase",
                "What This Phase Asks",
                "Opportunities",
                "Guidance",
            ],
            ReportType::DecisionSupport => &[
                "Decision Context",
                "Favourable Factors",
                "Cautions",
            ],
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownReportType(s.to_string()))
    }
}

/// Lifecycle status of a stored report.
///
/// Transitions only move forward: `pending → processing → completed | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable failure classes surfaced on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    NotFound,
    ValidationFailed,
    GenerationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::GenerationError => "GENERATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One headed block of narrated report text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportSection {
    pub heading: String,
    pub body: String,
}

impl ReportSection {
    pub fn new(heading: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            body: body.into(),
        }
    }
}

/// The generated report as shown to the user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<ReportSection>,
}

impl ReportContent {
    /// Total characters across all section bodies.
    pub fn body_chars(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.body.trim().chars().count())
            .sum()
    }
}

/// Which path produced a completed report's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum Degradation {
    /// Generated content passed validation.
    #[default]
    None,
    /// Generated content failed validation; the deterministic fallback passed.
    Fallback,
    /// Both failed validation and the report type accepts short content.
    AcceptedUnderLength,
}

/// A time-bounded claim naming the worker allowed to generate a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct GenerationLease {
    pub owner: Uuid,
    pub expires_at: Timestamp,
}

impl GenerationLease {
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

/// One report generation attempt, keyed by idempotency key and report id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoredReport {
    pub idempotency_key: String,
    pub report_id: Uuid,
    pub status: ReportStatus,
    pub report_type: ReportType,
    pub input: BirthInput,
    pub content: Option<ReportContent>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub degraded: Degradation,
    #[serde(default)]
    pub lease: Option<GenerationLease>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StoredReport {
    /// Create a fresh record. Only `pending` and `processing` are valid
    /// initial statuses.
    pub fn new(
        idempotency_key: impl Into<String>,
        report_type: ReportType,
        input: BirthInput,
        status: ReportStatus,
        now: Timestamp,
    ) -> Result<Self, CoreError> {
        if status.is_terminal() {
            return Err(CoreError::IllegalTransition {
                from: ReportStatus::Pending,
                to: status,
            });
        }
        Ok(Self {
            idempotency_key: idempotency_key.into(),
            report_id: Uuid::new_v4(),
            status,
            report_type,
            input,
            content: None,
            error_code: None,
            error_message: None,
            degraded: Degradation::None,
            lease: None,
            attempts: 0,
            usage: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The lease, if one is held and has not expired.
    pub fn live_lease(&self, now: Timestamp) -> Option<&GenerationLease> {
        self.lease.as_ref().filter(|l| l.is_live(now))
    }

    /// `pending → processing`. A record already processing is left alone.
    pub fn begin_processing(&mut self, now: Timestamp) -> Result<(), CoreError> {
        match self.status {
            ReportStatus::Pending => {
                self.status = ReportStatus::Processing;
                self.updated_at = now;
                Ok(())
            }
            ReportStatus::Processing => Ok(()),
            from => Err(CoreError::IllegalTransition {
                from,
                to: ReportStatus::Processing,
            }),
        }
    }

    /// Take the generation lease for `owner`.
    ///
    /// Fails with [`CoreError::LeaseHeld`] while another owner's lease is live.
    pub fn claim(
        &mut self,
        owner: Uuid,
        ttl: SignedDuration,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.require_processing(ReportStatus::Processing)?;
        if let Some(lease) = self.live_lease(now)
            && lease.owner != owner
        {
            return Err(CoreError::LeaseHeld {
                owner: lease.owner,
                expires_at: lease.expires_at,
            });
        }
        self.lease = Some(GenerationLease {
            owner,
            expires_at: lease_expiry(now, ttl),
        });
        self.attempts += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Extend `owner`'s lease. Fails with [`CoreError::LeaseLost`] when the
    /// record is no longer processing or another owner holds it.
    pub fn renew_lease(
        &mut self,
        owner: Uuid,
        ttl: SignedDuration,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        let held = self.status == ReportStatus::Processing
            && self.lease.is_some_and(|l| l.owner == owner);
        if !held {
            return Err(CoreError::LeaseLost { owner });
        }
        self.lease = Some(GenerationLease {
            owner,
            expires_at: lease_expiry(now, ttl),
        });
        self.updated_at = now;
        Ok(())
    }

    /// `processing → completed`.
    pub fn complete(
        &mut self,
        content: ReportContent,
        degraded: Degradation,
        usage: Option<TokenUsage>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.require_processing(ReportStatus::Completed)?;
        self.status = ReportStatus::Completed;
        self.content = Some(content);
        self.degraded = degraded;
        self.usage = usage;
        self.error_code = None;
        self.error_message = None;
        self.lease = None;
        self.updated_at = now;
        Ok(())
    }

    /// `processing → failed`.
    pub fn fail(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        self.require_processing(ReportStatus::Failed)?;
        self.status = ReportStatus::Failed;
        self.content = None;
        self.error_code = Some(code);
        self.error_message = Some(message.into());
        self.lease = None;
        self.updated_at = now;
        Ok(())
    }

    fn require_processing(&self, to: ReportStatus) -> Result<(), CoreError> {
        if self.status == ReportStatus::Processing {
            Ok(())
        } else {
            Err(CoreError::IllegalTransition {
                from: self.status,
                to,
            })
        }
    }
}

fn lease_expiry(now: Timestamp, ttl: SignedDuration) -> Timestamp {
    now.checked_add(ttl).unwrap_or(Timestamp::MAX)
}
