//! vitalsd: standalone health endpoint daemon.
//!
//! Assembles the health checker from CLI flags and an optional TOML file:
//! - Service registry shared with a heartbeat worker
//! - Upstream API and TCP reachability probes
//! - JSON or plain-text responses
//!
//! # Usage
//!
//! ```text
//! vitalsd --port 8080 --api upstream=http://10.0.0.5/health --tcp postgres=db:5432
//! ```

mod heartbeat;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::info;

use vitals_core::{
    ContextSerializer, HealthCheckBuilder, HealthCheckOptions, JsonSerializer, MonitoredWorker,
    PlainSerializer, ServiceRegistry,
};
use vitals_probes::{ApiCheck, TcpCheck};
use vitals_server::HealthChecker;

use crate::heartbeat::Heartbeat;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "vitalsd", about = "Vitals health endpoint daemon")]
struct Cli {
    /// TOML file with hostname, port and base_path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Interface to bind (`*` for all).
    #[arg(long)]
    hostname: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Path answered with the health report.
    #[arg(long)]
    base_path: Option<String>,

    /// Response body format.
    #[arg(long, value_enum, default_value = "json")]
    format: Format,

    /// Upstream API check as NAME=URL (repeatable).
    #[arg(long = "api", value_name = "NAME=URL")]
    apis: Vec<String>,

    /// TCP reachability check as NAME=HOST:PORT (repeatable).
    #[arg(long = "tcp", value_name = "NAME=ADDR")]
    tcps: Vec<String>,

    /// Probe timeout in milliseconds.
    #[arg(long, default_value = "2000")]
    probe_timeout_ms: u64,

    /// Heartbeat worker tick interval in seconds.
    #[arg(long, default_value = "5")]
    heartbeat_interval: u64,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    run(cli).await
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,vitalsd=debug,vitals=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let options = resolve_options(&cli)?;
    info!(hostname = %options.hostname, port = options.port, path = %options.base_path, "vitalsd starting");

    let registry = ServiceRegistry::new();
    let timeout = Duration::from_millis(cli.probe_timeout_ms);

    // ── Checks ─────────────────────────────────────────────────

    let mut builder = HealthCheckBuilder::new().add_monitored_service::<Heartbeat>();
    for spec in &cli.apis {
        let (name, url) = split_probe(spec)?;
        builder = builder.add_probe(name, ApiCheck::new(url).timeout(timeout));
        info!(check = name, %url, "api check registered");
    }
    for spec in &cli.tcps {
        let (name, addr) = split_probe(spec)?;
        builder = builder.add_probe(name, TcpCheck::new(addr).timeout(timeout));
        info!(check = name, %addr, "tcp check registered");
    }
    let checks = builder.build();

    let serializer: Arc<dyn ContextSerializer> = match cli.format {
        Format::Json => Arc::new(JsonSerializer),
        Format::Plain => Arc::new(PlainSerializer),
    };

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background worker ──────────────────────────────────────

    let mut heartbeat = MonitoredWorker::new(
        Heartbeat::new(Duration::from_secs(cli.heartbeat_interval)),
        registry.clone(),
    );
    heartbeat.start().await?;

    // ── Health endpoint ────────────────────────────────────────

    let checker = HealthChecker::new(options, checks, registry, serializer);
    let checker_handle = tokio::spawn(checker.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    heartbeat.stop().await?;
    let _ = checker_handle.await;

    info!("vitalsd stopped");
    Ok(())
}

/// File options first, then CLI overrides.
fn resolve_options(cli: &Cli) -> anyhow::Result<HealthCheckOptions> {
    let mut options = match &cli.config {
        Some(path) => HealthCheckOptions::from_file(path)?,
        None => HealthCheckOptions::default(),
    };
    if let Some(hostname) = &cli.hostname {
        options.hostname = hostname.clone();
    }
    if let Some(port) = cli.port {
        options.port = port;
    }
    if let Some(base_path) = &cli.base_path {
        options.base_path = base_path.clone();
    }
    options.validate()?;
    Ok(options)
}

/// Split `NAME=TARGET`.
fn split_probe(spec: &str) -> anyhow::Result<(&str, &str)> {
    match spec.split_once('=') {
        Some((name, target)) if !name.is_empty() && !target.is_empty() => Ok((name, target)),
        _ => bail!("invalid probe {spec:?}, expected NAME=TARGET"),
    }
}
