//! Validation escalation: generated content, then fallback, then either
//! under-length acceptance or failure.

use tracing::{info, warn};

use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{Degradation, ReportContent, ReportType};
use astrosetu_core::policy;

use crate::fallback::apply_fallback_no_api;
use crate::validate::{ReportValidator, ValidationFailure};

/// What to persist for one generation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Accepted {
        content: ReportContent,
        degraded: Degradation,
    },
    Rejected {
        reason: String,
    },
}

pub fn settle(
    validator: &dyn ReportValidator,
    report_type: ReportType,
    input: &BirthInput,
    generated: ReportContent,
) -> Settlement {
    let first = match validator.validate(report_type, &generated) {
        Ok(()) => {
            return Settlement::Accepted {
                content: generated,
                degraded: Degradation::None,
            };
        }
        Err(failure) => failure,
    };
    info!(
        report_type = %report_type,
        problems = %first,
        "generated content rejected, applying fallback"
    );

    let fallback = apply_fallback_no_api(report_type, input, &generated);
    match validator.validate(report_type, &fallback) {
        Ok(()) => Settlement::Accepted {
            content: fallback,
            degraded: Degradation::Fallback,
        },
        Err(second) if policy::accepts_under_length(report_type) => {
            warn!(
                report_type = %report_type,
                problems = %second,
                "accepting under-length fallback content"
            );
            Settlement::Accepted {
                content: fallback,
                degraded: Degradation::AcceptedUnderLength,
            }
        }
        Err(second) => Settlement::Rejected {
            reason: rejection_reason(&second),
        },
    }
}

fn rejection_reason(failure: &ValidationFailure) -> String {
    format!("report content failed validation after fallback: {failure}")
}
