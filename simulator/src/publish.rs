use crate::reading::generate_reading;
use anyhow::Result;
use playability::GameStatus;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const BURST_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub broker: String,
    pub port: u16,
    pub sensor_id: String,
    /// Readings per second
    pub rate: u64,
    pub outlier_ratio: f64,
    /// Stop after this many readings; run forever when `None`
    pub count: Option<u64>,
}

pub async fn run(opts: PublishOptions) -> Result<()> {
    let client_id = format!("pitchside-sim-{}", uuid::Uuid::new_v4());

    let mut mqtt_options = MqttOptions::new(&client_id, &opts.broker, opts.port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 20000);

    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                error!("MQTT eventloop error: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;

    let topic = format!("sensors/{}", opts.sensor_id);
    let rate = opts.rate.max(1);
    let burst_interval = Duration::from_millis((BURST_SIZE as u64 * 1000) / rate);
    info!(
        "Publishing to {} in bursts of {} readings every {:?}",
        topic, BURST_SIZE, burst_interval
    );

    let mut rng = rand::thread_rng();
    let mut counter = 0u64;
    let mut tally: HashMap<GameStatus, u64> = HashMap::new();

    'outer: loop {
        let burst_start = std::time::Instant::now();

        for _ in 0..BURST_SIZE {
            if opts.count.is_some_and(|limit| counter >= limit) {
                break 'outer;
            }

            let reading = generate_reading(&mut rng, opts.outlier_ratio);
            let verdict = reading.conditions().verdict();

            let payload = match serde_json::to_string(&reading) {
                Ok(p) => p,
                Err(e) => {
                    error!("Failed to serialize reading: {}", e);
                    continue;
                }
            };

            match client.publish(&topic, QoS::AtLeastOnce, false, payload).await {
                Ok(_) => {
                    counter += 1;
                    *tally.entry(verdict.status).or_default() += 1;
                    debug!(
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        air_quality = reading.air_quality,
                        "Published reading, expecting {}",
                        verdict
                    );
                }
                Err(e) => {
                    warn!("Failed to publish: {}", e);
                }
            }
        }

        if counter % 1000 < BURST_SIZE as u64 {
            log_tally(counter, &tally);
        }

        let elapsed = burst_start.elapsed();
        if elapsed < burst_interval {
            tokio::time::sleep(burst_interval - elapsed).await;
        } else if elapsed > burst_interval * 2 {
            warn!(
                "Burst took {:?}, target was {:?} - broker may be overloaded",
                elapsed, burst_interval
            );
        }
    }

    log_tally(counter, &tally);
    client.disconnect().await?;
    Ok(())
}

fn log_tally(counter: u64, tally: &HashMap<GameStatus, u64>) {
    let count = |status| tally.get(&status).copied().unwrap_or(0);
    info!(
        allowed = count(GameStatus::Allowed),
        postponed = count(GameStatus::Postponed),
        cancelled = count(GameStatus::Cancelled),
        forfeited = count(GameStatus::Forfeited),
        "Published {} readings",
        counter
    );
}
