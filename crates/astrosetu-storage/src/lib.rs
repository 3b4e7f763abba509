//! astrosetu-storage
//!
//! Persistence for stored reports. The [`store::ReportStore`] trait is the
//! seam the worker and HTTP service depend on; [`memory`] keeps records in
//! process and [`s3`] keeps them in an S3 bucket using conditional writes.

pub mod client;
pub mod error;
pub mod memory;
pub mod objects;
pub mod s3;
pub mod state;
pub mod store;
