//! CLI entry point for the transit watchdog.
//!
//! Loads the server list, primes the bundle cache, then runs the collector,
//! bundle refresher and config refresher side by side with the HTTP
//! endpoint until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_watchdog::{
    cache::{self, BundleCache, BundleRefresher},
    collector::Collector,
    config::{BasicAuth, ConfigRefresher, ConfigSnapshot, ConfigSource},
    metrics::WatchdogMetrics,
    server::{self, AppState},
};

#[derive(Parser)]
#[command(name = "transit_watchdog")]
#[command(
    version,
    about = "Cross-checks transit API deployments against their static and realtime feeds",
    long_about = None
)]
struct Cli {
    /// Path to a local JSON configuration file
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// URL to a remote JSON configuration file
    #[arg(long, value_name = "URL")]
    config_url: Option<String>,

    /// HTTP port for /metrics and /v1/healthcheck
    #[arg(long, default_value_t = 4000)]
    port: u16,

    /// Environment (development|staging|production)
    #[arg(long, default_value = "development")]
    env: String,

    /// Directory holding downloaded GTFS bundles
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Seconds between collection ticks
    #[arg(long, default_value_t = 30)]
    collect_interval_secs: u64,

    /// Seconds between GTFS bundle downloads
    #[arg(long, default_value_t = 24 * 60 * 60)]
    bundle_refresh_interval_secs: u64,

    /// Seconds between configuration reloads
    #[arg(long, default_value_t = 60)]
    config_refresh_interval_secs: u64,

    /// Maximum number of servers checked concurrently within one tick
    #[arg(long, default_value_t = 4)]
    max_concurrent_servers: usize,

    /// Stray positional arguments; any present is a configuration error
    #[arg(hide = true)]
    extra: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_watchdog.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_watchdog.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let auth = BasicAuth::from_parts(
        std::env::var("CONFIG_AUTH_USER").ok(),
        std::env::var("CONFIG_AUTH_PASS").ok(),
    );
    let source = ConfigSource::select(cli.config_file, cli.config_url, &cli.extra, auth)
        .context("invalid configuration source")?;

    let servers = source
        .load_required()
        .await
        .context("error loading configuration")?;
    info!(servers = servers.len(), source = %source.describe(), "Configuration loaded");

    cache::ensure_dir(&cli.cache_dir).context("failed to create cache directory")?;
    let bundle_cache = BundleCache::new(&cli.cache_dir);
    let stored = bundle_cache.store_all(&servers).await;
    info!(stored, total = servers.len(), "Initial GTFS bundle download complete");

    let snapshot = Arc::new(ConfigSnapshot::new(servers));
    let metrics = Arc::new(WatchdogMetrics::new().context("failed to register metrics")?);
    let shutdown = CancellationToken::new();

    let collector = Collector::new(
        Arc::clone(&snapshot),
        &cli.cache_dir,
        Arc::clone(&metrics),
        Duration::from_secs(cli.collect_interval_secs),
    )
    .with_max_concurrent(cli.max_concurrent_servers);

    let bundle_refresher = BundleRefresher::new(
        bundle_cache,
        Arc::clone(&snapshot),
        Duration::from_secs(cli.bundle_refresh_interval_secs),
    );

    let config_refresher = ConfigRefresher::new(
        source,
        Arc::clone(&snapshot),
        Duration::from_secs(cli.config_refresh_interval_secs),
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port))
        .await
        .with_context(|| format!("failed to bind port {}", cli.port))?;
    let state = AppState {
        env: cli.env,
        metrics,
    };

    let tasks = vec![
        tokio::spawn(collector.run(shutdown.clone())),
        tokio::spawn(bundle_refresher.run(shutdown.clone())),
        tokio::spawn(config_refresher.run(shutdown.clone())),
    ];
    let http = tokio::spawn(server::serve(listener, state, shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested, stopping tasks");
    shutdown.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            error!(error = %e, "Background task ended abnormally");
        }
    }
    match http.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
        Err(e) => error!(error = %e, "HTTP server task ended abnormally"),
    }

    info!("Watchdog stopped");
    Ok(())
}
