//! astrosetu-worker
//!
//! The report worker: claims a stored report, narrates it, validates the
//! result, falls back to deterministic text when validation fails and
//! persists exactly one terminal status.

pub mod error;
pub mod fallback;
pub mod settle;
pub mod validate;
pub mod worker;
