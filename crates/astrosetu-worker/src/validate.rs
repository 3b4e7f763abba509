use thiserror::Error;

use astrosetu_core::models::report::{ReportContent, ReportType};
use astrosetu_core::policy::{self, MIN_SECTION_BODY_CHARS};

/// Why a report's content was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .problems.join("; "))]
pub struct ValidationFailure {
    pub problems: Vec<String>,
}

impl ValidationFailure {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

/// Decides whether content is fit to show a paying reader.
pub trait ReportValidator: Send + Sync {
    fn validate(
        &self,
        report_type: ReportType,
        content: &ReportContent,
    ) -> Result<(), ValidationFailure>;
}

impl<F> ReportValidator for F
where
    F: Fn(ReportType, &ReportContent) -> Result<(), ValidationFailure> + Send + Sync,
{
    fn validate(
        &self,
        report_type: ReportType,
        content: &ReportContent,
    ) -> Result<(), ValidationFailure> {
        self(report_type, content)
    }
}

/// Structural and length minimums from [`astrosetu_core::policy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyValidator;

impl ReportValidator for PolicyValidator {
    fn validate(
        &self,
        report_type: ReportType,
        content: &ReportContent,
    ) -> Result<(), ValidationFailure> {
        let requirements = policy::requirements(report_type);
        let mut problems = Vec::new();

        if content.title.trim().is_empty() {
            problems.push("title is empty".to_string());
        }
        if content.summary.trim().is_empty() {
            problems.push("summary is empty".to_string());
        }
        if content.sections.len() < requirements.min_sections {
            problems.push(format!(
                "{} sections, need at least {}",
                content.sections.len(),
                requirements.min_sections
            ));
        }
        for (i, section) in content.sections.iter().enumerate() {
            if section.heading.trim().is_empty() {
                problems.push(format!("section {} has no heading", i + 1));
            }
            let chars = section.body.trim().chars().count();
            if chars < MIN_SECTION_BODY_CHARS {
                problems.push(format!(
                    "section {} body is {chars} characters, need at least {MIN_SECTION_BODY_CHARS}",
                    i + 1
                ));
            }
        }
        let total = content.body_chars();
        if total < requirements.min_body_chars {
            problems.push(format!(
                "{total} body characters, need at least {}",
                requirements.min_body_chars
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailure { problems })
        }
    }
}
