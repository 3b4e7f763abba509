//! Idempotency key derivation.
//!
//! A client that does not supply a key gets one derived from the report type
//! and the exact birth input, so double submissions of the same form land on
//! the same record.

use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::models::birth::BirthInput;
use crate::models::report::ReportType;

/// Longest caller-supplied key accepted.
pub const MAX_KEY_LEN: usize = 200;

/// Derive a stable key from the request contents.
pub fn derive_key(report_type: ReportType, input: &BirthInput) -> Result<String, CoreError> {
    let canonical = serde_json::to_vec(input)?;
    let mut hasher = Sha256::new();
    hasher.update(report_type.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(&canonical);
    Ok(format!("derived-{}", hex(&hasher.finalize())))
}

/// Check a caller-supplied key.
pub fn validate_key(key: &str) -> Result<(), CoreError> {
    if key.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "idempotency key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(CoreError::InvalidInput(format!(
            "idempotency key longer than {MAX_KEY_LEN} bytes"
        )));
    }
    Ok(())
}

/// Filesystem- and URL-safe digest of a key, used as a storage path segment.
pub fn key_digest(key: &str) -> String {
    hex(&Sha256::digest(key.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
