use lazy_static::lazy_static;
use playability::GameStatus;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pitchside_readings_total", "Total readings accepted, by transport"),
        &["source"]
    )
    .unwrap();
    pub static ref VERDICTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("pitchside_verdicts_total", "Game status stamped on accepted readings"),
        &["status"]
    )
    .unwrap();
    pub static ref INVALID_MESSAGES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "pitchside_invalid_messages_total",
        "Total readings rejected by parsing or validation"
    ))
    .unwrap();
    pub static ref DB_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "pitchside_db_failures_total",
        "Total database write failures"
    ))
    .unwrap();
    pub static ref INGEST_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pitchside_ingest_latency_seconds",
            "Time taken to store a reading or batch"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
    pub static ref BATCH_SIZE: Gauge = Gauge::with_opts(Opts::new(
        "pitchside_batch_size",
        "Current MQTT batch size being flushed"
    ))
    .unwrap();
    pub static ref CHANNEL_FULL_TOTAL: Counter = Counter::with_opts(Opts::new(
        "pitchside_channel_full_total",
        "Total number of times the MQTT channel was full (backpressure events)"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(READINGS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VERDICTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVALID_MESSAGES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DB_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INGEST_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(BATCH_SIZE.clone()))?;
    REGISTRY.register(Box::new(CHANNEL_FULL_TOTAL.clone()))?;
    Ok(())
}

/// Counts one accepted reading and the status it was stamped with.
pub fn record_accepted(source: &str, status: GameStatus) {
    READINGS_TOTAL.with_label_values(&[source]).inc();
    VERDICTS_TOTAL.with_label_values(&[status.as_str()]).inc();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
