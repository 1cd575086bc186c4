//! Logging infrastructure
//!
//! Diagnostics go through `tracing`. Request outcomes on the report
//! surface are additionally written as JSONL access events.

pub mod access;

pub use access::{AccessEvent, AccessLogger, EventType};
