//! astrosetu-bedrock
//!
//! Report narration. [`generator::ReportGenerator`] is the seam the worker
//! calls; [`converse::BedrockReportGenerator`] implements it with the
//! Bedrock Converse API.

pub mod converse;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod tokens;
