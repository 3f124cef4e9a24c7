//! scope-rs - Main Entry Point
//!
//! Loads a scope configuration, starts acquisition, and runs a text display
//! loop that prints the latest window of every channel at a fixed rate.

use anyhow::Context;
use clap::Parser;
use scope_rs::{
    acquisition::{Acquisition, AcquisitionEvent},
    config::{default_config_path, LoggingConfig, ScopeConfig},
    frontend::{ConsoleRenderer, ScopeView},
    types::StopReason,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Live oscilloscope for numeric record streams
#[derive(Parser, Debug)]
#[command(name = "scope-rs", version, about)]
struct Cli {
    /// Configuration file (JSON, or TOML with a .toml extension)
    config: Option<PathBuf>,

    /// Also write logs to daily rolling files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Display refresh rate in frames per second
    #[arg(long, default_value_t = 10)]
    fps: u32,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Start with the display frozen on the first frame
    #[arg(long)]
    hold: bool,
}

fn init_logging(logging: &LoggingConfig, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_filter = logging
        .filter
        .clone()
        .unwrap_or_else(|| "info,scope_rs=debug".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match log_dir
        .map(Path::to_path_buf)
        .or_else(|| logging.directory.clone())
    {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "scope-rs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .or_else(default_config_path)
        .context("No config file given and no platform config directory")?;
    let config = ScopeConfig::load(&config_path)?;

    let _log_guard = init_logging(&config.logging, cli.log_dir.as_deref());
    tracing::info!("Starting scope-rs with {}", config_path.display());

    let acquisition = Acquisition::start(&config).context("Failed to start acquisition")?;
    tracing::info!(
        "Reading {} channel(s) from {}",
        config.dimension(),
        acquisition.transport_name()
    );

    let mut view = ScopeView::from_config(acquisition.buffer(), &config);
    view.set_hold(cli.hold);
    let renderer = ConsoleRenderer::default();
    let frame_period = Duration::from_secs(1) / cli.fps.max(1);
    let deadline = cli
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    let mut stop_reason = None;
    loop {
        let frame_start = Instant::now();

        for event in acquisition.drain_events() {
            match event {
                AcquisitionEvent::Stats(stats) => tracing::debug!(
                    "{:.1} samples/s, {} dropped records",
                    stats.effective_sample_rate,
                    stats.dropped_records()
                ),
                AcquisitionEvent::Stopped { reason, .. } => stop_reason = Some(reason),
            }
        }
        if !acquisition.is_running() {
            break;
        }
        if deadline.is_some_and(|d| frame_start >= d) {
            tracing::info!("Duration elapsed");
            break;
        }

        view.refresh()?;
        {
            let mut out = std::io::stdout().lock();
            renderer.render(&view, &mut out)?;
            writeln!(out)?;
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_period {
            std::thread::sleep(frame_period - elapsed);
        }
    }

    // The final event may land after the last drain
    for event in acquisition.drain_events() {
        if let AcquisitionEvent::Stopped { reason, .. } = event {
            stop_reason = Some(reason);
        }
    }

    tracing::info!("Shutting down...");
    let stats = acquisition.shutdown()?;
    tracing::info!(
        "Appended {} of {} records ({:.1}%)",
        stats.samples_appended,
        stats.records_received,
        stats.success_rate()
    );

    if let Some(StopReason::TransportFailed(e)) = stop_reason {
        anyhow::bail!("Acquisition ended: {}", e);
    }
    Ok(())
}
