//! astrosetu-client
//!
//! Client side of report generation: an HTTP adapter for the service, the
//! generation controller that starts one report and polls it to a terminal
//! state, and the elapsed-time presenter shown while it runs.

pub mod api;
pub mod controller;
pub mod elapsed;
pub mod error;
