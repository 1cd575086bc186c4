//! Territory Reports - territory-scoped CRM metrics over HTTP
//!
//! Brokers see only the organizations inside their assigned territory;
//! admins and managers see the whole book. On top of that scoping the
//! service computes read-only reports from CRM records.
//!
//! ## Components
//!
//! - **Territory**: token classification, validation, query and record scoping
//! - **Reports**: executive dashboard, territory performance, pipeline health
//! - **Source**: where the CRM records come from
//! - **Server**: hyper HTTP surface with JWT auth and per-user rate limits

pub mod auth;
pub mod clock;
pub mod config;
pub mod logging;
pub mod ratelimit;
pub mod reports;
pub mod routes;
pub mod server;
pub mod source;
pub mod territory;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ReportError, Result};
