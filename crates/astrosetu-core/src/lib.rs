//! astrosetu-core
//!
//! Pure domain types for the report-generation lifecycle: birth input,
//! stored report records and their transitions, wire DTOs, policy constants
//! and storage key conventions. No AWS SDK dependency. This is the shared
//! vocabulary of the AstroSetu services and the client.

pub mod error;
pub mod idempotency;
pub mod models;
pub mod policy;
pub mod store_keys;
