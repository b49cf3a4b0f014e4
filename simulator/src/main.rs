mod publish;
mod reading;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pitch-side sensor simulator and dashboard poller
#[derive(Debug, Parser)]
#[command(name = "pitchside-simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish generated readings over MQTT, like the pitch-side sensor
    Publish {
        #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
        broker: String,
        #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
        port: u16,
        #[arg(long, env = "SENSOR_ID", default_value = "pitch-1")]
        sensor_id: String,
        /// Readings per second
        #[arg(long, env = "RATE", default_value_t = 1)]
        rate: u64,
        /// Share of readings outside fair conditions, 0.0 to 1.0
        #[arg(long, env = "OUTLIER_RATIO", default_value_t = 0.2, value_parser = parse_ratio)]
        outlier_ratio: f64,
        /// Stop after this many readings
        #[arg(long)]
        count: Option<u64>,
    },
    /// Poll the ingestor and label each reading, like the dashboard
    Watch {
        #[arg(long, env = "PITCHSIDE_URL", default_value = "http://localhost:5000")]
        url: String,
        /// Seconds between polls
        #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 5)]
        interval: u64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s.trim().parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{ratio} is not between 0.0 and 1.0"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Publish {
            broker,
            port,
            sensor_id,
            rate,
            outlier_ratio,
            count,
        } => {
            info!("Starting pitch-side sensor simulator");
            info!("Broker: {}:{}, Sensor: {}, Rate: {} readings/s", broker, port, sensor_id, rate);
            publish::run(publish::PublishOptions {
                broker,
                port,
                sensor_id,
                rate,
                outlier_ratio,
                count,
            })
            .await
        }
        Command::Watch {
            url,
            interval,
            limit,
        } => {
            watch::run(watch::WatchOptions {
                base_url: url,
                interval: Duration::from_secs(interval.max(1)),
                limit,
            })
            .await
        }
    }
}
