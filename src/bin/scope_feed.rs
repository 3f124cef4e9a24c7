//! scope-feed - synthetic record generator
//!
//! Sends test records to a UDP scope:
//!
//! - `counter`: one channel counting 0..9
//! - `triangle`: four channels, two ramps and two square waves
//!
//! Usage:
//!   cargo run --bin scope-feed -- triangle --target 127.0.0.1:9000

use clap::{Parser, ValueEnum};
use std::net::UdpSocket;
use std::time::Duration;

/// Synthetic record generator for scope-rs
#[derive(Parser, Debug)]
#[command(name = "scope-feed", version, about)]
struct Cli {
    /// Record pattern to send
    #[arg(value_enum, default_value_t = Pattern::Triangle)]
    pattern: Pattern,

    /// Destination address
    #[arg(long, default_value = "127.0.0.1:9000")]
    target: String,

    /// Delay between records in milliseconds (default depends on the pattern)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many records
    #[arg(long)]
    count: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Pattern {
    Counter,
    Triangle,
}

impl Pattern {
    fn default_interval(self) -> Duration {
        match self {
            Pattern::Counter => Duration::from_millis(10),
            Pattern::Triangle => Duration::from_millis(50),
        }
    }

    /// Record number `step` of the pattern; both patterns repeat every 10 steps
    fn record(self, step: u64) -> String {
        let n = step % 10;
        match self {
            Pattern::Counter => n.to_string(),
            Pattern::Triangle => format!(
                "{};{};{};{}",
                n,
                (n + 5) % 10,
                (n / 5) * 10,
                (((n + 2) % 10) / 5) * 10
            ),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let interval = cli
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| cli.pattern.default_interval());

    tracing::info!("Sending {:?} records to {}", cli.pattern, cli.target);

    let mut step = 0u64;
    while cli.count.map_or(true, |count| step < count) {
        let record = cli.pattern.record(step);
        tracing::debug!("send {}", record);
        socket.send_to(record.as_bytes(), &cli.target)?;
        step += 1;
        std::thread::sleep(interval);
    }

    tracing::info!("Sent {} records", step);
    Ok(())
}
