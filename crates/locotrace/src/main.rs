// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! locotrace CLI
//!
//! Runs the sampling pipeline against a scripted scenario.
//!
//! # Usage
//!
//! ```bash
//! # Sample the scenario's observed vehicle into per-vehicle files
//! locotrace --scenario scenario.yaml --directory /tmp/runs
//!
//! # Stream to a listener for ten seconds
//! locotrace --scenario scenario.yaml --udp localhost:10000 --duration 10s
//!
//! # Full settings from YAML
//! locotrace --config locotrace.yaml --scenario scenario.yaml --verbose
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use locotrace::{ExporterConfig, Scheduler, ScriptedHost};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "locotrace")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sample the driven vehicle on a timer and export it over UDP and to files")]
#[command(long_about = None)]
struct Cli {
    /// Exporter configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario describing the simulated vehicles (YAML)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Stop after this long (e.g. 500ms, 10s, 2m); runs until Ctrl+C otherwise
    #[arg(short, long)]
    duration: Option<String>,

    /// Send datagrams to HOST:PORT
    #[arg(long, value_name = "HOST:PORT")]
    udp: Option<String>,

    /// Directory for per-vehicle files
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Disable file output
    #[arg(long)]
    no_file: bool,

    /// Sampling interval in milliseconds
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Verbose mode (debug logs, per-tick trace at info)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("locotrace=debug")
    } else {
        EnvFilter::new("locotrace=info")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let config = build_config(&cli)?;
    let duration = cli.duration.as_deref().map(parse_duration).transpose()?;

    let host = Arc::new(
        ScriptedHost::from_file(&cli.scenario)
            .with_context(|| format!("Failed to load scenario {}", cli.scenario.display()))?,
    );

    tracing::info!(
        interval_ms = config.interval_ms,
        udp = config.send_udp,
        file = config.write_to_file,
        directory = %config.directory.display(),
        "Starting locotrace"
    );

    let scheduler = Scheduler::new(host.clone(), config.clone());
    scheduler
        .enable(config.clone())
        .context("Failed to start sampling")?;

    let stop = Arc::new(AtomicBool::new(false));
    ctrlc_handler(Arc::clone(&stop));

    // The scripted world moves on its own clock, independent of sampling.
    let step = config.interval();
    let started = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        if duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        std::thread::sleep(step);
        host.step(step);
    }

    scheduler.shutdown();

    let stats = scheduler.stats();
    tracing::info!(
        ticks = stats.ticks,
        idle_ticks = stats.idle_ticks,
        records = stats.records,
        sink_failures = stats.sink_failures,
        panics = stats.panics,
        "locotrace shutdown complete"
    );

    Ok(())
}

fn build_config(cli: &Cli) -> Result<ExporterConfig> {
    let mut config = match &cli.config {
        Some(path) => ExporterConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExporterConfig::default(),
    };

    // The CLI always samples.
    config.active = true;
    if cli.verbose {
        config.debug = true;
    }
    if let Some(target) = &cli.udp {
        let (host, port) = parse_target(target)?;
        config.send_udp = true;
        config.udp_host = host;
        config.udp_port = port;
    }
    if let Some(directory) = &cli.directory {
        config.directory = directory.clone();
        config.write_to_file = true;
    }
    if cli.no_file {
        config.write_to_file = false;
    }
    if let Some(ms) = cli.interval_ms {
        config.interval_ms = ms;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Parse `host:port`.
fn parse_target(s: &str) -> Result<(String, u16)> {
    let Some((host, port)) = s.rsplit_once(':') else {
        bail!("expected HOST:PORT, got '{}'", s);
    };
    let port = port
        .parse::<u16>()
        .with_context(|| format!("invalid port in '{}'", s))?;
    if host.is_empty() {
        bail!("empty host in '{}'", s);
    }
    Ok((host.to_string(), port))
}

/// Parse a duration like "500ms", "10s", "2m" or bare seconds.
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let parsed = if let Some(num) = s.strip_suffix("ms") {
        num.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(num) = s.strip_suffix('s') {
        num.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(num) = s.strip_suffix('m') {
        num.parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };

    parsed.with_context(|| format!("invalid duration '{}'", s))
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop: Arc<AtomicBool>) {
    let _ = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, shutting down...");
        stop.store(true, Ordering::Relaxed);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert_eq!(parse_duration("10S").unwrap(), Duration::from_secs(10));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration(&format!("{}m", u64::MAX)).is_err());
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("localhost:10000").unwrap(),
            ("localhost".to_string(), 10000)
        );
        assert!(parse_target("localhost").is_err());
        assert!(parse_target(":10000").is_err());
        assert!(parse_target("host:99999").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "locotrace",
            "--scenario",
            "s.yaml",
            "--udp",
            "10.0.0.2:12000",
            "--no-file",
            "--interval-ms",
            "250",
        ]);
        let config = build_config(&cli).unwrap();
        assert!(config.active);
        assert!(config.send_udp);
        assert_eq!(config.udp_host, "10.0.0.2");
        assert_eq!(config.udp_port, 12000);
        assert!(!config.write_to_file);
        assert_eq!(config.interval_ms, 250);
    }
}
