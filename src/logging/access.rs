//! Access log for the report surface
//!
//! One JSONL line per served or refused report request, for audit and
//! usage analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Report computed and returned
    ReportServed,
    /// Missing or invalid bearer token
    AuthRejected,
    /// Caller exceeded its request window
    RateLimited,
    /// Request failed after authentication
    RequestFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Instance that handled the request
    pub instance_id: String,
    pub endpoint: String,
    pub user_id: Option<String>,
    pub role: Option<String>,
    /// HTTP status returned
    pub status: u16,
    pub duration_ms: Option<u64>,
    /// Records the report was computed over, after territory scoping
    pub records: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AccessEvent {
    pub fn new(event_type: EventType, instance_id: String, endpoint: &str, status: u16) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            instance_id,
            endpoint: endpoint.to_string(),
            user_id: None,
            role: None,
            status,
            duration_ms: None,
            records: None,
            detail: None,
        }
    }

    pub fn with_user(mut self, user_id: &str, role: &Role) -> Self {
        self.user_id = Some(user_id.to_string());
        self.role = Some(role.as_str().to_string());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_records(mut self, records: usize) -> Self {
        self.records = Some(records);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Writes [`AccessEvent`]s to a JSONL file. Without a file every event is
/// dropped, so callers never need to check whether logging is enabled.
#[derive(Clone)]
pub struct AccessLogger {
    inner: Arc<Mutex<AccessLoggerInner>>,
    instance_id: String,
}

struct AccessLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AccessLogger {
    pub fn new(instance_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AccessLoggerInner {
                writer: None,
                path: None,
            })),
            instance_id,
        }
    }

    /// Start appending to `path`, creating it if needed
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));
        inner.path = Some(path.clone());

        info!("Access logging initialized to {}", path.display());
        Ok(())
    }

    pub async fn path(&self) -> Option<PathBuf> {
        self.inner.lock().await.path.clone()
    }

    /// Event pre-filled with this instance's id
    pub fn event(&self, event_type: EventType, endpoint: &str, status: u16) -> AccessEvent {
        AccessEvent::new(event_type, self.instance_id.clone(), endpoint, status)
    }

    pub async fn log(&self, event: AccessEvent) {
        let line = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize access event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", line) {
                error!("Failed to write access event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush access log: {}", e);
            }
        }
    }
}
