//! HTTP routes for the reporting service

pub mod health;
pub mod reports;

pub use health::{health_check, version_info};
pub use reports::{handle_report_request, ReportEnvelope, ReportKind, ReportParams, ReportRequest};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::types::ReportError;

/// `{error, message}` body shared by every failure response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub fn error_response(err: &ReportError) -> Response<Full<Bytes>> {
    json_response(
        err.status_code(),
        &ErrorBody {
            error: err.code(),
            message: err.public_message(),
        },
    )
}
