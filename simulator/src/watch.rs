use crate::reading::{ReadingsPage, StoredReading};
use anyhow::{Context, Result};
use playability::Verdict;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub base_url: String,
    pub interval: Duration,
    pub limit: usize,
}

/// One dashboard row, labelled locally
#[derive(Debug, Clone)]
pub struct Row {
    pub reading: StoredReading,
    pub verdict: Verdict,
}

impl Row {
    /// Stored status disagrees with the local evaluation.
    pub fn is_stale(&self) -> bool {
        self.reading.status != self.verdict.status
    }
}

pub fn label_rows(readings: Vec<StoredReading>) -> Vec<Row> {
    readings
        .into_iter()
        .map(|reading| Row {
            verdict: reading.conditions().verdict(),
            reading,
        })
        .collect()
}

pub async fn run(opts: WatchOptions) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;
    let url = format!("{}/sensor-data", opts.base_url.trim_end_matches('/'));

    info!("Polling {} every {:?}", url, opts.interval);
    let mut ticker = tokio::time::interval(opts.interval);

    loop {
        ticker.tick().await;

        match fetch(&client, &url, opts.limit).await {
            Ok(readings) => render(&label_rows(readings)),
            Err(e) => error!("Error fetching sensor data: {:#}", e),
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str, limit: usize) -> Result<Vec<StoredReading>> {
    let page: ReadingsPage = client
        .get(url)
        .query(&[("limit", limit)])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(page.data)
}

fn render(rows: &[Row]) {
    let Some(newest) = rows.first() else {
        info!("No data available");
        return;
    };

    info!(
        temperature = newest.reading.temperature,
        humidity = newest.reading.humidity,
        air_quality = newest.reading.air_quality,
        "{} {}",
        newest.verdict.headline(),
        newest.verdict
    );

    for row in rows {
        info!(
            "#{:<6} {:>6.1}°C {:>5.1}% AQI {:>6.1}  {}  {}",
            row.reading.id,
            row.reading.temperature,
            row.reading.humidity,
            row.reading.air_quality,
            row.reading.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.verdict
        );
        if row.is_stale() {
            warn!(
                id = row.reading.id,
                stored = %row.reading.status,
                computed = %row.verdict.status,
                "Stored status disagrees with current rules"
            );
        }
    }
}
