//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::clock::{Clock, SystemClock};
use crate::config::Args;
use crate::logging::AccessLogger;
use crate::ratelimit::RateLimiter;
use crate::routes::{self, reports::REPORTS_PREFIX};
use crate::source::RecordSource;
use crate::types::{ReportError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    /// Where report records come from
    pub source: Arc<dyn RecordSource>,
    /// Per (user, endpoint) request windows
    pub rate_limiter: RateLimiter,
    pub clock: Arc<dyn Clock>,
    pub access_log: AccessLogger,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(args: Args, source: Arc<dyn RecordSource>) -> Result<Self> {
        Self::with_clock(args, source, Arc::new(SystemClock))
    }

    /// Build state around an explicit clock
    pub fn with_clock(
        args: Args,
        source: Arc<dyn RecordSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let jwt = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            (None, true) => JwtValidator::new_dev(),
            (None, false) => {
                return Err(ReportError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };
        let rate_limiter = RateLimiter::new(
            args.rate_limit_window_secs,
            args.rate_limit_max_requests,
            Arc::clone(&clock),
        );
        let access_log = AccessLogger::new(args.instance_id.to_string());

        Ok(Self {
            started_at: clock.now(),
            args,
            jwt,
            source,
            rate_limiter,
            clock,
            access_log,
        })
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Reports listening on {} as instance {}",
        state.args.listen, state.args.instance_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - dev JWT secret in use unless JWT_SECRET is set");
    }

    spawn_rate_limit_cleanup(
        Arc::clone(&state),
        Duration::from_secs(state.args.rate_limit_window_secs),
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Periodically drop finished rate limit windows
pub fn spawn_rate_limit_cleanup(
    state: Arc<AppState>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = state.rate_limiter.purge_expired();
            if removed > 0 {
                debug!("Rate limit cleanup: removed {} expired windows", removed);
            }
        }
    })
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let auth_header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let response = route(state, &method, &path, query.as_deref(), auth_header.as_deref()).await;
    Ok(to_boxed(response))
}

/// Dispatch one request to its handler
pub async fn route(
    state: Arc<AppState>,
    method: &Method,
    path: &str,
    query: Option<&str>,
    auth_header: Option<&str>,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => routes::health_check(state),

        (&Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        (_, p) if p == REPORTS_PREFIX || p.starts_with("/reports/") => {
            routes::handle_report_request(state, method, p, query, auth_header).await
        }

        _ => not_found_response(path),
    }
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::error_response(&ReportError::NotFound(format!("No route for {path}")))
}
