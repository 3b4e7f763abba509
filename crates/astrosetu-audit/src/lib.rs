//! astrosetu-audit
//!
//! Structured audit events for the report lifecycle, emitted through
//! `tracing` so they land in the same log stream as request logs.

pub mod events;
