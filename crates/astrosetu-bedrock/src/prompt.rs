//! Prompt assembly for report narration.
//!
//! The system prompt fixes the output contract (a single JSON object shaped
//! like `ReportContent`); the user message carries the birth details in a
//! structured block plus the report type's outline.

use astrosetu_core::models::birth::BirthInput;
use astrosetu_core::models::report::ReportType;
use astrosetu_core::policy::{self, MIN_SECTION_BODY_CHARS};

pub const SYSTEM_PROMPT: &str = "\
You are an experienced Vedic astrologer writing a personalised report for a paying reader. \
Write in warm, plain English addressed to the reader by first name. \
Never invent chart placements you were not given; speak in terms of tendencies and periods. \
Respond with exactly one JSON object and nothing else, of the form \
{\"title\": string, \"summary\": string, \"sections\": [{\"heading\": string, \"body\": string}]}.";

/// Build the structured birth-details block.
pub fn build_birth_block(input: &BirthInput) -> String {
    let mut block = String::from("<birth_details>\n");
    block.push_str(&format!("<name>{}</name>\n", input.name.trim()));
    block.push_str(&format!("<date_of_birth>{}</date_of_birth>\n", input.dob.trim()));
    block.push_str(&format!("<time_of_birth>{}</time_of_birth>\n", input.tob.trim()));
    block.push_str(&format!("<place_of_birth>{}</place_of_birth>\n", input.place.trim()));
    if let (Some(lat), Some(lon)) = (input.latitude, input.longitude) {
        block.push_str(&format!("<coordinates>{lat:.4}, {lon:.4}</coordinates>\n"));
    }
    if let Some(tz) = &input.timezone {
        block.push_str(&format!("<timezone>{tz}</timezone>\n"));
    }
    block.push_str("</birth_details>");
    block
}

/// Build the user message for one report.
pub fn build_user_message(report_type: ReportType, input: &BirthInput) -> String {
    let requirements = policy::requirements(report_type);
    let mut message = build_birth_block(input);
    message.push_str("\n\n");
    message.push_str(&format!(
        "Write a \"{}\" report for {}.\n",
        report_type.display_name(),
        input.first_name()
    ));
    message.push_str("Use these sections, in this order:\n");
    for heading in report_type.outline() {
        message.push_str(&format!("- {heading}\n"));
    }
    message.push_str(&format!(
        "Each section body must be at least {MIN_SECTION_BODY_CHARS} characters, and the \
         section bodies together at least {} characters.",
        requirements.min_body_chars
    ));
    message
}
