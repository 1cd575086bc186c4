//! Report endpoints (/reports/*)
//!
//! Every report request goes through the same steps: resolve the path,
//! authenticate the bearer token, count the request against the caller's
//! window, parse the query, load and scope the records, then aggregate.
//! Failures at any step become an `{error, message}` body here, never a
//! dropped connection.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::error_response;
use crate::auth::{extract_token_from_header, User};
use crate::config::Args;
use crate::logging::EventType;
use crate::ratelimit::RateLimitDecision;
use crate::reports::{
    compute_executive_dashboard, compute_pipeline_health, compute_territory_performance,
    ComparisonBasis, DashboardOptions,
};
use crate::server::AppState;
use crate::source::load_dataset;
use crate::territory::{format_territory, parse_tokens};
use crate::types::{ReportError, Result};

pub const REPORTS_PREFIX: &str = "/reports";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Dashboard,
    TerritoryPerformance,
    PipelineHealth,
}

impl ReportKind {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/reports/dashboard" => Some(Self::Dashboard),
            "/reports/territory-performance" => Some(Self::TerritoryPerformance),
            "/reports/pipeline-health" => Some(Self::PipelineHealth),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Dashboard => "/reports/dashboard",
            Self::TerritoryPerformance => "/reports/territory-performance",
            Self::PipelineHealth => "/reports/pipeline-health",
        }
    }
}

/// Raw query string parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub period: Option<String>,
    pub account_manager: Option<String>,
    pub compare_with: Option<String>,
}

impl ReportParams {
    pub fn parse(query: Option<&str>) -> Result<Self> {
        match query {
            None | Some("") => Ok(Self::default()),
            Some(q) => serde_urlencoded::from_str(q)
                .map_err(|e| ReportError::BadRequest(format!("Invalid query string: {}", e))),
        }
    }

    /// Apply configured defaults and bounds
    pub fn resolve(self, args: &Args) -> Result<ReportRequest> {
        let period_days = match self.period.as_deref().map(str::trim) {
            None | Some("") => args.default_period_days,
            Some(raw) => {
                let days: u32 = raw.parse().map_err(|_| {
                    ReportError::BadRequest(format!("period must be a number of days, got '{raw}'"))
                })?;
                if days == 0 || days > args.max_period_days {
                    return Err(ReportError::BadRequest(format!(
                        "period must be between 1 and {} days",
                        args.max_period_days
                    )));
                }
                days
            }
        };

        let compare_with = match self.compare_with.as_deref().map(str::trim) {
            None | Some("") => ComparisonBasis::default(),
            Some(raw) => raw.parse().map_err(ReportError::BadRequest)?,
        };

        let account_manager = self
            .account_manager
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        Ok(ReportRequest {
            period_days,
            account_manager,
            compare_with,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub period_days: u32,
    pub account_manager: Option<String>,
    pub compare_with: ComparisonBasis,
}

/// Success body: `{data, generated, period}`
#[derive(Debug, Serialize)]
pub struct ReportEnvelope<T> {
    pub data: T,
    pub generated: DateTime<Utc>,
    /// Window length in days
    pub period: u32,
}

/// Handle a request under /reports/*
pub async fn handle_report_request(
    state: Arc<AppState>,
    method: &Method,
    path: &str,
    query: Option<&str>,
    auth_header: Option<&str>,
) -> Response<Full<Bytes>> {
    let started = Instant::now();

    let Some(kind) = ReportKind::from_path(path) else {
        return error_response(&ReportError::NotFound(format!("No report at {path}")));
    };

    if method != Method::GET {
        let mut response = error_response(&ReportError::MethodNotAllowed(format!(
            "{method} is not supported on {}",
            kind.path()
        )));
        response
            .headers_mut()
            .insert(hyper::header::ALLOW, hyper::header::HeaderValue::from_static("GET, OPTIONS"));
        return response;
    }

    let user = match authenticate(&state, auth_header) {
        Ok(user) => user,
        Err(e) => {
            warn!(endpoint = kind.path(), "Report request rejected: {}", e);
            state
                .access_log
                .log(
                    state
                        .access_log
                        .event(EventType::AuthRejected, kind.path(), 401)
                        .with_timestamp(state.clock.now())
                        .with_detail(e.public_message()),
                )
                .await;
            return error_response(&e);
        }
    };

    let decision = state.rate_limiter.check(&user.id, kind.path());
    if !decision.allowed {
        warn!(user = %user.id, endpoint = kind.path(), "Rate limit exceeded");
        state
            .access_log
            .log(
                state
                    .access_log
                    .event(EventType::RateLimited, kind.path(), 429)
                    .with_timestamp(state.clock.now())
                    .with_user(&user.id, &user.role),
            )
            .await;
        let err = ReportError::RateLimited(format!(
            "Too many requests, retry after {}",
            decision.reset_at.to_rfc3339()
        ));
        return with_rate_limit_headers(error_response(&err), &state, &decision, true);
    }

    let result = build_report(&state, kind, &user, query).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let response = match result {
        Ok((body, records)) => {
            info!(
                user = %user.id,
                role = %user.role,
                territory = %format_territory(&parse_tokens(&user.territory)),
                endpoint = kind.path(),
                records,
                elapsed_ms,
                "Report served"
            );
            state
                .access_log
                .log(
                    state
                        .access_log
                        .event(EventType::ReportServed, kind.path(), 200)
                        .with_timestamp(state.clock.now())
                        .with_user(&user.id, &user.role)
                        .with_records(records)
                        .with_duration(elapsed_ms),
                )
                .await;
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(Full::new(Bytes::from(body)))
                .unwrap()
        }
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                error!(user = %user.id, endpoint = kind.path(), "Report failed: {}", e);
            } else {
                debug!(user = %user.id, endpoint = kind.path(), "Report request invalid: {}", e);
            }
            state
                .access_log
                .log(
                    state
                        .access_log
                        .event(EventType::RequestFailed, kind.path(), status.as_u16())
                        .with_timestamp(state.clock.now())
                        .with_user(&user.id, &user.role)
                        .with_duration(elapsed_ms)
                        .with_detail(e.to_string()),
                )
                .await;
            error_response(&e)
        }
    };

    with_rate_limit_headers(response, &state, &decision, false)
}

fn authenticate(state: &AppState, auth_header: Option<&str>) -> Result<User> {
    let token = extract_token_from_header(auth_header).ok_or_else(|| {
        ReportError::Unauthorized("Missing or malformed Authorization header".into())
    })?;
    let claims = state.jwt.verify_token(token).into_claims()?;
    Ok(claims.to_user())
}

/// Load, scope and aggregate. Returns the serialized envelope and the
/// number of records the report covered.
async fn build_report(
    state: &AppState,
    kind: ReportKind,
    user: &User,
    query: Option<&str>,
) -> Result<(String, usize)> {
    let request = ReportParams::parse(query)?.resolve(&state.args)?;
    let now = state.clock.now();

    let mut dataset = load_dataset(state.source.as_ref()).await?.visible_to(user);
    let manager = request.account_manager.as_deref();

    let data = match kind {
        ReportKind::Dashboard => {
            if let Some(manager) = manager {
                dataset = dataset.managed_by(manager);
            }
            let options = DashboardOptions {
                period_days: request.period_days,
                compare_with: request.compare_with,
            };
            to_value(compute_executive_dashboard(
                &dataset.organizations,
                &dataset.contacts,
                &dataset.interactions,
                &dataset.deals,
                options,
                now,
            )?)?
        }
        ReportKind::TerritoryPerformance => to_value(compute_territory_performance(
            &dataset.organizations,
            &dataset.interactions,
            &dataset.deals,
            manager,
            now,
        ))?,
        ReportKind::PipelineHealth => to_value(compute_pipeline_health(
            &dataset.organizations,
            &dataset.deals,
            manager,
            now,
        ))?,
    };

    let envelope = ReportEnvelope {
        data,
        generated: now,
        period: request.period_days,
    };
    let body = serde_json::to_string(&envelope)
        .map_err(|e| ReportError::Internal(format!("Failed to serialize report: {}", e)))?;
    Ok((body, dataset.record_count()))
}

fn to_value<T: Serialize>(report: T) -> Result<serde_json::Value> {
    serde_json::to_value(report)
        .map_err(|e| ReportError::Internal(format!("Failed to serialize report: {}", e)))
}

fn with_rate_limit_headers(
    mut response: Response<Full<Bytes>>,
    state: &AppState,
    decision: &RateLimitDecision,
    limited: bool,
) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    let mut set = |name: &'static str, value: String| {
        if let Ok(value) = hyper::header::HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    };

    set("x-ratelimit-limit", state.rate_limiter.max_requests().to_string());
    set("x-ratelimit-remaining", decision.remaining.to_string());
    set("x-ratelimit-reset", decision.reset_at.timestamp().to_string());
    if limited {
        let retry = (decision.reset_at - state.clock.now()).num_seconds().max(0);
        set("retry-after", retry.to_string());
    }
    response
}
