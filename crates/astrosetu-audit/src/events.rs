use serde::Serialize;
use tracing::{Level, event};

use astrosetu_core::models::report::{Degradation, StoredReport};

/// `tracing` target every audit event is emitted under.
pub const AUDIT_TARGET: &str = "audit";

/// Lifecycle actions worth an audit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditAction {
    #[serde(rename = "report.created")]
    ReportCreated,
    #[serde(rename = "report.resumed")]
    ReportResumed,
    #[serde(rename = "report.claimed")]
    ReportClaimed,
    #[serde(rename = "report.fallback_applied")]
    FallbackApplied,
    #[serde(rename = "report.completed")]
    ReportCompleted,
    #[serde(rename = "report.failed")]
    ReportFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ReportCreated => "report.created",
            AuditAction::ReportResumed => "report.resumed",
            AuditAction::ReportClaimed => "report.claimed",
            AuditAction::FallbackApplied => "report.fallback_applied",
            AuditAction::ReportCompleted => "report.completed",
            AuditAction::ReportFailed => "report.failed",
        }
    }
}

/// A structured audit event about one stored report.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub report_id: String,
    pub report_type: String,
    pub status: String,
    /// Who caused the event: a worker id, or `api` for request handlers.
    pub actor: String,
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, report: &StoredReport, actor: impl Into<String>) -> Self {
        Self {
            action,
            report_id: report.report_id.to_string(),
            report_type: report.report_type.to_string(),
            status: report.status.to_string(),
            actor: actor.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Record how a completed report's content was produced.
    pub fn with_degradation(self, degraded: Degradation) -> Self {
        match degraded {
            Degradation::None => self,
            other => self.with_details(serde_json::json!({ "degraded": other })),
        }
    }

    /// Emit this audit event via tracing.
    pub fn emit(&self) {
        let details = self
            .details
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        event!(
            target: AUDIT_TARGET,
            Level::INFO,
            audit.action = self.action.as_str(),
            audit.report_id = %self.report_id,
            audit.report_type = %self.report_type,
            audit.status = %self.status,
            audit.actor = %self.actor,
            audit.details = %details,
            "audit event"
        );
    }
}
