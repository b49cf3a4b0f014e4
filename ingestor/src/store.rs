use crate::errors::Result;
use crate::model::{ReadingRecord, SensorReading};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Persistence for evaluated readings
#[async_trait]
pub trait ReadingStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Stores one reading and returns it with its assigned id.
    async fn insert(&self, record: ReadingRecord) -> Result<SensorReading>;

    async fn insert_batch(&self, batch: &[ReadingRecord]) -> Result<()>;

    /// Most recent readings, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<SensorReading>>;
}

/// Process-local store, used when no database is configured
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: RwLock<Vec<SensorReading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, record: ReadingRecord) -> Result<SensorReading> {
        let mut readings = self.readings.write().await;
        let reading = record.with_id(readings.len() as i64 + 1);
        readings.push(reading.clone());
        Ok(reading)
    }

    async fn insert_batch(&self, batch: &[ReadingRecord]) -> Result<()> {
        let mut readings = self.readings.write().await;
        for record in batch {
            let id = readings.len() as i64 + 1;
            readings.push(record.clone().with_id(id));
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SensorReading>> {
        let readings = self.readings.read().await;
        let mut latest: Vec<SensorReading> = readings.clone();
        // Ties on timestamp fall back to insertion order.
        latest.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        latest.truncate(limit);
        Ok(latest)
    }
}
