use thiserror::Error;

#[derive(Debug, Error)]
pub enum BedrockError {
    /// The Converse call itself failed (throttling, access, network).
    #[error("report narration request failed: {0}")]
    Invocation(String),

    /// The model replied, but with no text to read a report from.
    #[error("model returned no report text")]
    EmptyResponse,

    #[error("report reply had no JSON object: {0}")]
    ResponseParse(String),

    #[error("report reply did not match the report shape: {0}")]
    SchemaViolation(String),
}
