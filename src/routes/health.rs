//! Health and version endpoints
//!
//! - /health, /healthz - liveness probe, 200 whenever the process serves
//! - /version - build information for deployment verification

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::json_response;
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Seconds since the server state was built
    pub uptime: u64,
    pub timestamp: String,
    /// `development` or `production`
    pub mode: &'static str,
    pub instance_id: String,
    /// Users currently holding a rate limit window
    pub rate_limited_keys: usize,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let now = state.clock.now();
    HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        uptime: u64::try_from((now - state.started_at).num_seconds()).unwrap_or(0),
        timestamp: now.to_rfc3339(),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        instance_id: state.args.instance_id.to_string(),
        rate_limited_keys: state.rate_limiter.tracked_keys(),
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &build_health_response(&state))
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "territory-reports",
    };
    json_response(StatusCode::OK, &response)
}
