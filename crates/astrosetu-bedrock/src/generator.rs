use std::sync::Arc;

use async_trait::async_trait;

use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{ReportContent, ReportType};
use astrosetu_core::models::usage::TokenUsage;

use crate::error::BedrockError;

/// Output of one generation call.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub content: ReportContent,
    /// Token usage, when the backend reports it.
    pub usage: Option<TokenUsage>,
}

impl From<ReportContent> for GeneratedReport {
    fn from(content: ReportContent) -> Self {
        Self {
            content,
            usage: None,
        }
    }
}

/// Produces narrated report content for a birth input.
///
/// Implementations may be slow and may return content of any length; the
/// worker validates whatever comes back.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(
        &self,
        report_type: ReportType,
        input: &BirthInput,
    ) -> Result<GeneratedReport, BedrockError>;
}

#[async_trait]
impl<G: ReportGenerator + ?Sized> ReportGenerator for Arc<G> {
    async fn generate(
        &self,
        report_type: ReportType,
        input: &BirthInput,
    ) -> Result<GeneratedReport, BedrockError> {
        (**self).generate(report_type, input).await
    }
}
