use ingestor::config::Config;
use ingestor::db::PgStore;
use ingestor::store::{MemoryStore, ReadingStore};
use ingestor::{batching, metrics, mqtt, rest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; variables may come from the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    info!("Starting pitchside ingestor");
    info!("HTTP server: {}", config.http_addr);

    metrics::init_metrics()?;

    let store: Arc<dyn ReadingStore> = match &config.database_url {
        Some(url) => {
            info!("Database: {}", url.split('@').last().unwrap_or("***"));
            match PgStore::connect(url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to connect to database: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            warn!("DATABASE_URL not set, readings are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let mqtt_handle = match config.mqtt.clone() {
        Some(mqtt_config) => {
            info!("MQTT broker: {}:{}", mqtt_config.broker, mqtt_config.port);
            info!("Channel capacity: {}", config.channel_capacity);
            let (tx, rx) = mpsc::channel(config.channel_capacity);

            let batcher_store = store.clone();
            let batch_size = config.batch_size;
            let batch_timeout_ms = config.batch_timeout_ms;
            tokio::spawn(async move {
                batching::run_batcher(rx, batcher_store, "mqtt", batch_size, batch_timeout_ms).await;
            });

            let client_id = format!("pitchside-ingestor-{}", uuid::Uuid::new_v4());
            Some(tokio::spawn(async move {
                if let Err(e) = mqtt::run_mqtt(mqtt_config, client_id, tx).await {
                    error!("MQTT task failed: {}", e);
                }
            }))
        }
        None => {
            info!("MQTT_BROKER not set, accepting readings over HTTP only");
            None
        }
    };

    let app = rest::create_router(store, config.query);

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    let mqtt_done = async {
        match mqtt_handle {
            Some(handle) => {
                let _ = handle.await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = mqtt_done => {
            error!("MQTT task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
    Ok(())
}
