use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, Message, SystemContentBlock,
};
use tracing::info;
use uuid::Uuid;

use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::{ReportContent, ReportType};
use astrosetu_core::models::usage::TokenUsage;

use crate::error::BedrockError;
use crate::generator::{GeneratedReport, ReportGenerator};
use crate::prompt;
use crate::tokens;

/// Narrates reports with a Claude model through the Bedrock Converse API.
#[derive(Clone)]
pub struct BedrockReportGenerator {
    client: Client,
    model_id: String,
}

impl BedrockReportGenerator {
    pub fn new(client: Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    pub fn from_config(config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self::new(Client::new(config), model_id)
    }
}

#[async_trait]
impl ReportGenerator for BedrockReportGenerator {
    async fn generate(
        &self,
        report_type: ReportType,
        input: &BirthInput,
    ) -> Result<GeneratedReport, BedrockError> {
        let transaction_id = Uuid::new_v4();
        info!(
            transaction_id = %transaction_id,
            model = %self.model_id,
            report_type = %report_type,
            "starting report narration"
        );

        let user_message = prompt::build_user_message(report_type, input);
        let (response_text, usage) = invoke_converse(
            &self.client,
            &self.model_id,
            prompt::SYSTEM_PROMPT,
            &user_message,
        )
        .await?;

        let content = parse_report_content(&response_text)?;

        info!(
            transaction_id = %transaction_id,
            sections = content.sections.len(),
            output_tokens = usage.tokens.output,
            "report narration complete"
        );

        Ok(GeneratedReport {
            content,
            usage: Some(usage),
        })
    }
}

/// Parse the model's reply into `ReportContent`.
///
/// Models sometimes wrap JSON in a Markdown code fence or add a sentence
/// before it; only the outermost `{ ... }` is parsed.
pub fn parse_report_content(response_text: &str) -> Result<ReportContent, BedrockError> {
    if response_text.trim().is_empty() {
        return Err(BedrockError::EmptyResponse);
    }
    let start = response_text.find('{');
    let end = response_text.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &response_text[start..=end],
        _ => {
            return Err(BedrockError::ResponseParse(format!(
                "no JSON object in response: {response_text}"
            )));
        }
    };

    serde_json::from_str(json).map_err(|e| {
        BedrockError::SchemaViolation(format!(
            "failed to parse ReportContent: {e}. Response: {response_text}"
        ))
    })
}

/// Core invocation using the Bedrock Converse API.
/// Returns the response text and token usage.
async fn invoke_converse(
    client: &Client,
    model_id: &str,
    system_prompt: &str,
    user_message: &str,
) -> Result<(String, TokenUsage), BedrockError> {
    let response = client
        .converse()
        .model_id(model_id)
        .system(SystemContentBlock::Text(system_prompt.to_string()))
        .messages(
            Message::builder()
                .role(ConversationRole::User)
                .content(ContentBlock::Text(user_message.to_string()))
                .build()
                .map_err(|e| BedrockError::Invocation(e.to_string()))?,
        )
        .send()
        .await
        .map_err(|e| BedrockError::Invocation(e.into_service_error().to_string()))?;

    let output_message = response
        .output()
        .and_then(|o| o.as_message().ok())
        .ok_or(BedrockError::EmptyResponse)?;

    let response_text = output_message
        .content()
        .iter()
        .filter_map(|block| {
            if let ContentBlock::Text(text) = block {
                Some(text.as_str())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("");

    let tokens = response
        .usage()
        .map(tokens::extract_token_count)
        .unwrap_or_default();

    Ok((response_text, tokens::usage_for(model_id, tokens)))
}
