//! recs-embedder: regenerate embeddings for recommendations and annotations.

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recs_core::{defaults, EmbeddingBackend};
use recs_db::{connect_with_retry, Database, PoolConfig};
use recs_inference::OllamaBackend;
use recs_jobs::{regenerate, EmbeddingScheduler, SchedulerConfig, SchedulerEvent};

use crate::cli::Cli;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn required_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{} must be set", key))
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "recs_embedder=info,recs_jobs=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recs_embedder=info,recs_jobs=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("recs-embedder.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _log_guard = init_logging();

    let database_url = required_env("DATABASE_URL")?;
    let connect_retries: u32 = env_or("DB_CONNECT_RETRIES", defaults::DB_CONNECT_RETRIES);
    let connect_delay = Duration::from_millis(env_or(
        "DB_CONNECT_RETRY_DELAY_MS",
        defaults::DB_CONNECT_RETRY_DELAY_MS,
    ));
    let drain_timeout = Duration::from_secs(env_or(
        "REGENERATE_TIMEOUT_SECS",
        defaults::REGENERATE_TIMEOUT_SECS,
    ));

    info!("Connecting to database...");
    let pool = connect_with_retry(
        &database_url,
        &PoolConfig::default(),
        connect_retries,
        connect_delay,
    )
    .await?;
    let db = Database::new(pool);
    info!("Database connected");

    let backend = Arc::new(OllamaBackend::from_env()?);
    info!(
        base_url = backend.base_url(),
        model = backend.model_name(),
        dimension = backend.dimension(),
        "Embedding backend configured"
    );

    let store = Arc::new(db.entities.clone());
    let scheduler = EmbeddingScheduler::start(SchedulerConfig::from_env(), store.clone(), backend)?;

    // Count terminal failures until the loop stops.
    let mut events = scheduler.events();
    let failures = tokio::spawn(async move {
        let mut failed = 0usize;
        loop {
            match events.recv().await {
                Ok(SchedulerEvent::TaskFailed { .. }) => failed += 1,
                Ok(SchedulerEvent::SchedulerStopped) | Err(RecvError::Closed) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Scheduler event receiver lagged, failure count may be low")
                }
            }
        }
        failed
    });

    for kind in cli.kinds() {
        let report = regenerate(&scheduler, store.as_ref(), kind, cli.mode()).await?;
        info!(
            entity_kind = %report.kind,
            total = report.total,
            admitted = report.admitted,
            rejected = report.rejected,
            "Regeneration queued"
        );
    }

    let poll = Duration::from_millis(defaults::REGENERATE_POLL_INTERVAL_MS);
    let drained = tokio::select! {
        idle = scheduler.wait_until_idle(poll, drain_timeout) => idle,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, clearing queue");
            scheduler.clear();
            false
        }
    };

    let status = scheduler.status();
    if drained {
        info!("Embedding queue drained");
    } else {
        warn!(
            queue_length = status.queue_length,
            processing = status.processing,
            "Stopping before the embedding queue drained"
        );
    }

    scheduler.shutdown().await?;
    let failed = failures.await?;

    if failed > 0 {
        error!(failed, "Some embeddings could not be generated");
        bail!("{} embedding task(s) failed", failed);
    }
    info!("Embedding regeneration complete");
    Ok(())
}
