use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    /// In-memory storage when unset
    pub database_url: Option<String>,
    /// MQTT ingestion is disabled when unset
    pub mqtt: Option<MqttConfig>,
    pub batch_size: usize,
    pub batch_timeout_ms: u64,
    pub channel_capacity: usize,
    pub query: QueryLimits,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub topic: String,
}

/// Bounds for the "recent readings" window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl QueryLimits {
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mqtt = match non_empty("MQTT_BROKER") {
            Some(broker) => Some(MqttConfig {
                broker,
                port: parsed("MQTT_PORT", 1883)?,
                topic: optional("MQTT_TOPIC", "sensors/#"),
            }),
            None => None,
        };

        let query = QueryLimits {
            default_limit: parsed("RECENT_LIMIT", 10)?,
            max_limit: parsed("MAX_LIMIT", 100)?,
        };
        if query.max_limit == 0 {
            anyhow::bail!("MAX_LIMIT must be at least 1");
        }

        Ok(Self {
            http_addr: optional("HTTP_ADDR", "0.0.0.0:5000"),
            database_url: non_empty("DATABASE_URL"),
            mqtt,
            batch_size: parsed("BATCH_SIZE", 500)?,
            batch_timeout_ms: parsed("BATCH_TIMEOUT_MS", 50)?,
            channel_capacity: parsed("CHANNEL_CAPACITY", 10_000)?,
            query,
        })
    }
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
