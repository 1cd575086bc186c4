//! Configuration for the reporting service
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Upper bound for `MAX_PERIOD_DAYS`, one hundred years
pub const PERIOD_DAYS_CEILING: u32 = 36_500;
/// Upper bound for `RATE_LIMIT_WINDOW_SECS`, one day
pub const RATE_LIMIT_WINDOW_CEILING_SECS: u64 = 86_400;

/// Territory-scoped CRM reports over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "territory-reports")]
#[command(about = "Territory-scoped CRM metrics and reporting service")]
pub struct Args {
    /// Unique identifier for this instance, stamped on access events
    #[arg(long, env = "INSTANCE_ID", default_value_t = Uuid::new_v4())]
    pub instance_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (well-known JWT secret, empty dataset allowed)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// JSON snapshot of organizations, contacts, interactions and deals
    #[arg(long, env = "DATASET_PATH")]
    pub dataset: Option<PathBuf>,

    /// Append JSONL access events to this file
    #[arg(long, env = "ACCESS_LOG_PATH")]
    pub access_log: Option<PathBuf>,

    /// Reporting window in days when `period` is not given
    #[arg(long, env = "DEFAULT_PERIOD_DAYS", default_value = "30")]
    pub default_period_days: u32,

    /// Largest accepted `period`
    #[arg(long, env = "MAX_PERIOD_DAYS", default_value = "365")]
    pub max_period_days: u32,

    /// Rate limit window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value = "60")]
    pub rate_limit_window_secs: u64,

    /// Report requests allowed per user and endpoint in one window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value = "100")]
    pub rate_limit_max_requests: u32,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
            if self.dataset.is_none() {
                return Err("DATASET_PATH is required in production mode".to_string());
            }
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err("LOG_FORMAT must be text or json".to_string());
        }

        if self.default_period_days == 0 {
            return Err("DEFAULT_PERIOD_DAYS must be at least 1".to_string());
        }
        if self.default_period_days > self.max_period_days {
            return Err("DEFAULT_PERIOD_DAYS must not exceed MAX_PERIOD_DAYS".to_string());
        }
        if self.max_period_days > PERIOD_DAYS_CEILING {
            return Err(format!("MAX_PERIOD_DAYS must not exceed {PERIOD_DAYS_CEILING}"));
        }
        if self.rate_limit_window_secs == 0 || self.rate_limit_max_requests == 0 {
            return Err("Rate limit window and request count must be positive".to_string());
        }
        if self.rate_limit_window_secs > RATE_LIMIT_WINDOW_CEILING_SECS {
            return Err(format!(
                "RATE_LIMIT_WINDOW_SECS must not exceed {RATE_LIMIT_WINDOW_CEILING_SECS}"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["territory-reports", "--dev-mode"]);
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.default_period_days, 30);
        assert_eq!(args.max_period_days, 365);
        assert_eq!(args.rate_limit_window_secs, 60);
        assert_eq!(args.rate_limit_max_requests, 100);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret_and_dataset() {
        let args = Args::parse_from(["territory-reports"]);
        assert!(args.validate().is_err());

        let short = Args::parse_from(["territory-reports", "--jwt-secret", "short"]);
        assert!(short.validate().unwrap_err().contains("32"));

        let no_data = Args::parse_from(["territory-reports", "--jwt-secret", SECRET]);
        assert!(no_data.validate().unwrap_err().contains("DATASET_PATH"));

        let ok = Args::parse_from([
            "territory-reports",
            "--jwt-secret",
            SECRET,
            "--dataset",
            "/data/crm.json",
        ]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_period_bounds() {
        let args = Args::parse_from([
            "territory-reports",
            "--dev-mode",
            "--default-period-days",
            "400",
        ]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_upper_bounds() {
        let at_ceiling = Args::parse_from([
            "territory-reports",
            "--dev-mode",
            "--max-period-days",
            "36500",
            "--rate-limit-window-secs",
            "86400",
        ]);
        assert!(at_ceiling.validate().is_ok());

        let period = Args::parse_from([
            "territory-reports",
            "--dev-mode",
            "--max-period-days",
            "3000000000",
        ]);
        assert!(period.validate().unwrap_err().contains("MAX_PERIOD_DAYS"));

        let window = Args::parse_from([
            "territory-reports",
            "--dev-mode",
            "--rate-limit-window-secs",
            "18446744073709551615",
        ]);
        assert!(window.validate().unwrap_err().contains("RATE_LIMIT_WINDOW_SECS"));
    }
}
