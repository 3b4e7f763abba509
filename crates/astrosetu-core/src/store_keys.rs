//! Storage key conventions.
//!
//! Pure string functions with no AWS SDK dependency. These define the canonical
//! layout of report objects in the AstroSetu bucket.

use uuid::Uuid;

use crate::idempotency::key_digest;

pub const REPORTS_PREFIX: &str = "reports/";

pub const IDEMPOTENCY_PREFIX: &str = "idempotency/";

pub fn report(id: Uuid) -> String {
    format!("{REPORTS_PREFIX}{id}.json")
}

/// Index object mapping an idempotency key to the report it created.
pub fn idempotency(key: &str) -> String {
    format!("{IDEMPOTENCY_PREFIX}{}.json", key_digest(key))
}
