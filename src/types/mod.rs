//! Shared types

pub mod error;

pub use error::{ReportError, Result};
