//! Prometheus probe exporter for NFS exports.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use nfs_probe_exporter::config::{LogFormat, ProbeStrategy};
use nfs_probe_exporter::{ExporterConfig, HttpServer, Prober, SystemRunner};

/// Prometheus probe exporter for NFS exports.
#[derive(Parser, Debug)]
#[command(name = "nfs-probe-exporter")]
#[command(about = "Check NFS export availability on every Prometheus scrape")]
#[command(version)]
struct Args {
    /// Listen address (host:port).
    listen: String,

    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Probe strategy: direct or export-list (overrides config).
    #[arg(long)]
    strategy: Option<ProbeStrategy>,

    /// Timeout for each tool invocation in seconds (overrides config).
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            // Usage errors exit with 1, not clap's default 2.
            let _ = e.print();
            return ExitCode::from(1);
        }
        Err(e) => e.exit(),
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // Override from CLI
    if let Some(strategy) = args.strategy {
        config.probe.strategy = strategy;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.probe.timeout_secs = timeout_secs;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_logging(&config.logging.level, config.logging.format)?;

    let listen_addr: SocketAddr = args
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", args.listen, e))?;

    info!(
        strategy = config.probe.strategy.as_str(),
        timeout_secs = config.probe.timeout_secs,
        "Starting NFS probe exporter"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let prober = Arc::new(Prober::new(SystemRunner, config.probe.clone()));
    let http_server = HttpServer::new(prober, listen_addr, config.http.path.clone());

    let mut http_task = tokio::spawn(async move { http_server.run(shutdown_rx).await });

    // Wait for shutdown signal, or for the server to die on its own
    tokio::select! {
        result = &mut http_task => {
            return match result {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => error!("HTTP server did not stop in time"),
        Ok(Ok(Ok(()))) => {}
    }

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn sigterm() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}

fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let log_level: Level = level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("nfs_probe_exporter={}", log_level).parse()?)
        .add_directive(format!("tower_http={}", Level::WARN).parse()?);

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}
