pub mod api;
pub mod birth;
pub mod report;
pub mod usage;
