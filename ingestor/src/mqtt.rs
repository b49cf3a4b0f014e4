use crate::config::MqttConfig;
use crate::errors::{Error, Result};
use crate::metrics::{CHANNEL_FULL_TOTAL, INVALID_MESSAGES_TOTAL};
use crate::model::{NewReading, ReadingRecord};
use crate::validate::validate;
use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub async fn run_mqtt(
    config: MqttConfig,
    client_id: String,
    tx: mpsc::Sender<ReadingRecord>,
) -> Result<()> {
    info!("Connecting to MQTT broker at {}:{}", config.broker, config.port);

    let mut mqtt_options = MqttOptions::new(client_id, config.broker, config.port);
    mqtt_options.set_keep_alive(std::time::Duration::from_secs(30));
    mqtt_options.set_clean_session(false);

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 10000);

    client
        .subscribe(config.topic.as_str(), QoS::AtLeastOnce)
        .await
        .map_err(Error::Mqtt)?;

    info!("Subscribed to {} with QoS 1", config.topic);

    loop {
        match eventloop.poll().await {
            Ok(notification) => {
                if let Event::Incoming(Packet::Publish(publish)) = notification {
                    debug!(
                        "Received reading on topic {}, size: {} bytes",
                        publish.topic,
                        publish.payload.len()
                    );

                    handle_payload(&publish.topic, &publish.payload, &tx).await?;
                }
            }
            Err(e) => {
                error!("MQTT error: {}", e);
                // rumqttc reconnects on the next poll
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

/// Drops unusable payloads; fails only when the batcher has gone away.
async fn handle_payload(
    topic: &str,
    payload: &[u8],
    tx: &mpsc::Sender<ReadingRecord>,
) -> Result<()> {
    match process_message(payload, tx).await {
        Ok(()) => Ok(()),
        Err(Error::ChannelSend) => {
            error!("Batcher channel closed, stopping MQTT ingestion");
            Err(Error::ChannelSend)
        }
        Err(e) => {
            warn!("Dropping reading from {}: {}", topic, e);
            INVALID_MESSAGES_TOTAL.inc();
            Ok(())
        }
    }
}

/// Parses, validates and evaluates one payload, then hands it to the batcher.
async fn process_message(payload: &[u8], tx: &mpsc::Sender<ReadingRecord>) -> Result<()> {
    let reading = serde_json::from_slice::<NewReading>(payload)
        .map_err(|e| Error::Validation(format!("JSON parse error: {}", e)))?;

    validate(&reading)?;

    let record = reading.into_record(Utc::now());

    match tx.try_send(record) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(record)) => {
            CHANNEL_FULL_TOTAL.inc();
            debug!("Channel full, using blocking send");
            tx.send(record).await.map_err(|_| Error::ChannelSend)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(Error::ChannelSend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playability::GameStatus;

    #[test]
    fn test_process_message_stamps_status() {
        tokio_test::block_on(async {
            let (tx, mut rx) = mpsc::channel(10);
            let payload = br#"{"temperature": 24.0, "humidity": 60.0, "air_quality": 140.0}"#;

            assert!(process_message(payload, &tx).await.is_ok());

            let received = rx.recv().await.unwrap();
            assert_eq!(received.status, GameStatus::Cancelled);
            assert_eq!(received.air_quality, 140.0);
        });
    }

    #[test]
    fn test_process_message_invalid_json() {
        tokio_test::block_on(async {
            let (tx, _rx) = mpsc::channel(10);
            let payload = b"invalid json";

            assert!(matches!(
                process_message(payload, &tx).await,
                Err(Error::Validation(_))
            ));
        });
    }

    #[test]
    fn test_process_message_missing_field() {
        tokio_test::block_on(async {
            let (tx, _rx) = mpsc::channel(10);
            let payload = br#"{"temperature": 24.0, "humidity": 60.0}"#;

            assert!(process_message(payload, &tx).await.is_err());
        });
    }

    #[test]
    fn test_bad_payload_is_dropped_not_fatal() {
        tokio_test::block_on(async {
            let (tx, mut rx) = mpsc::channel(10);

            assert!(handle_payload("sensors/pitch-1", b"{}", &tx).await.is_ok());
            assert!(rx.try_recv().is_err());
        });
    }

    #[test]
    fn test_closed_channel_stops_ingestion_without_waiting() {
        tokio_test::block_on(async {
            let (tx, rx) = mpsc::channel(1);
            drop(rx);
            let payload = br#"{"temperature": 24.0, "humidity": 60.0, "air_quality": 10.0}"#;

            let start = std::time::Instant::now();
            let result = handle_payload("sensors/pitch-1", payload, &tx).await;

            assert!(matches!(result, Err(Error::ChannelSend)));
            assert!(start.elapsed() < std::time::Duration::from_millis(50));
        });
    }

    #[test]
    fn test_process_message_closed_channel() {
        tokio_test::block_on(async {
            let (tx, rx) = mpsc::channel(1);
            drop(rx);
            let payload = br#"{"temperature": 24.0, "humidity": 60.0, "air_quality": 10.0}"#;

            assert!(matches!(
                process_message(payload, &tx).await,
                Err(Error::ChannelSend)
            ));
        });
    }
}
