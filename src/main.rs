//! Territory Reports - territory-scoped CRM metrics over HTTP

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use territory_reports::{
    config::Args,
    server::{self, AppState},
    source::{RecordSource, SnapshotSource},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    let json_logs = args.log_format == "json";
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("territory_reports={},info", log_level).into()),
        )
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Territory Reports");
    info!("======================================");
    info!("Instance ID: {}", args.instance_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!(
        "Period: default {} days, max {} days",
        args.default_period_days, args.max_period_days
    );
    info!(
        "Rate limit: {} requests / {}s per user and report",
        args.rate_limit_max_requests, args.rate_limit_window_secs
    );
    info!("======================================");

    let source: Arc<dyn RecordSource> = match &args.dataset {
        Some(path) => match SnapshotSource::from_file(path) {
            Ok(source) => Arc::new(source),
            Err(e) if args.dev_mode => {
                warn!("Dataset load failed (dev mode, continuing empty): {}", e);
                Arc::new(SnapshotSource::empty())
            }
            Err(e) => {
                error!("Dataset load failed: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("No dataset configured, serving reports over an empty book");
            Arc::new(SnapshotSource::empty())
        }
    };

    let access_log_path = args.access_log.clone();
    let state = AppState::new(args, source)?;

    if let Some(path) = access_log_path {
        if let Err(e) = state.access_log.init_file(path).await {
            warn!("Access log unavailable, continuing without: {}", e);
        }
    }

    server::run(Arc::new(state)).await?;
    Ok(())
}
