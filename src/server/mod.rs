//! HTTP server

pub mod http;

pub use http::{route, run, spawn_rate_limit_cleanup, AppState};
