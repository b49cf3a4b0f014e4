use crate::metrics::{self, BATCH_SIZE, INGEST_LATENCY_SECONDS};
use crate::model::ReadingRecord;
use crate::store::ReadingStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};
use tracing::{debug, error, info};

/// Buffers readings from `rx` and writes them to `store` by size or timeout.
///
/// `source` labels the accepted-reading metrics, which only count readings
/// the store has actually taken.
pub async fn run_batcher(
    mut rx: mpsc::Receiver<ReadingRecord>,
    store: Arc<dyn ReadingStore>,
    source: &'static str,
    max_batch: usize,
    max_wait_ms: u64,
) {
    info!(
        "Starting batcher with max_batch={}, max_wait_ms={}, store={}",
        max_batch,
        max_wait_ms,
        store.backend_tag()
    );

    let mut buffer: Vec<ReadingRecord> = Vec::with_capacity(max_batch);
    let mut ticker = interval(Duration::from_millis(max_wait_ms.max(1)));

    loop {
        tokio::select! {
            record = rx.recv() => {
                match record {
                    Some(r) => {
                        buffer.push(r);

                        if buffer.len() >= max_batch {
                            flush_batch(store.as_ref(), source, &mut buffer).await;
                        }
                    }
                    None => {
                        info!("Channel closed, flushing remaining batch");
                        flush_batch(store.as_ref(), source, &mut buffer).await;
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush_batch(store.as_ref(), source, &mut buffer).await;
                }
            }
        }
    }

    info!("Batcher stopped");
}

/// One write per batch; retrying transient failures is the store's job.
async fn flush_batch(store: &dyn ReadingStore, source: &str, buffer: &mut Vec<ReadingRecord>) {
    let batch_len = buffer.len();
    if batch_len == 0 {
        return;
    }

    debug!("Flushing batch of {} readings", batch_len);
    BATCH_SIZE.set(batch_len as f64);

    let start = Instant::now();
    match store.insert_batch(buffer).await {
        Ok(()) => {
            let elapsed = start.elapsed().as_secs_f64();
            INGEST_LATENCY_SECONDS.observe(elapsed);
            debug!("Batch stored in {:.3}s", elapsed);
            for record in buffer.iter() {
                metrics::record_accepted(source, record.status);
            }
        }
        Err(e) => {
            error!("Failed to store batch: {}", e);
            error!("CRITICAL: {} readings dropped due to storage failure", batch_len);
        }
    }

    buffer.clear();
    BATCH_SIZE.set(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Error, Result};
    use crate::metrics::READINGS_TOTAL;
    use crate::model::SensorReading;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FailingStore {
        batch_calls: AtomicUsize,
    }

    #[async_trait]
    impl ReadingStore for FailingStore {
        fn backend_tag(&self) -> &'static str {
            "failing"
        }

        async fn insert(&self, _record: ReadingRecord) -> Result<SensorReading> {
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }

        async fn insert_batch(&self, _batch: &[ReadingRecord]) -> Result<()> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Database(sqlx::Error::PoolTimedOut))
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<SensorReading>> {
            Ok(Vec::new())
        }
    }

    fn record(humidity: f64) -> ReadingRecord {
        ReadingRecord {
            temperature: 20.0,
            humidity,
            air_quality: 25.0,
            status: playability::evaluate(20.0, humidity, 25.0),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_batcher_flushes_on_close() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_batcher(rx, store.clone(), "batch-close-test", 100, 10_000));
        for humidity in [40.0, 80.0, 95.0] {
            tx.send(record(humidity)).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(store.recent(10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_batcher_flushes_when_full() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_batcher(rx, store.clone(), "batch-full-test", 2, 10_000));
        tx.send(record(40.0)).await.unwrap();
        tx.send(record(50.0)).await.unwrap();

        let mut stored = 0;
        for _ in 0..50 {
            stored = store.recent(10).await.unwrap().len();
            if stored == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(stored, 2);

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_stored_readings_are_counted() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_batcher(rx, store, "batch-count-test", 100, 10_000));
        tx.send(record(40.0)).await.unwrap();
        tx.send(record(95.0)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let counted = READINGS_TOTAL.with_label_values(&["batch-count-test"]).get();
        assert_eq!(counted, 2.0);
    }

    #[tokio::test]
    async fn test_failed_batch_written_once_and_not_counted() {
        let store = Arc::new(FailingStore::default());
        let (tx, rx) = mpsc::channel(16);

        let handle = tokio::spawn(run_batcher(rx, store.clone(), "batch-fail-test", 100, 10_000));
        tx.send(record(40.0)).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(store.batch_calls.load(Ordering::SeqCst), 1);
        let counted = READINGS_TOTAL.with_label_values(&["batch-fail-test"]).get();
        assert_eq!(counted, 0.0);
    }
}
