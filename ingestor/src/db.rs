use crate::errors::{Error, Result};
use crate::metrics::DB_FAILURES_TOTAL;
use crate::model::{ReadingRecord, SensorReading};
use crate::store::ReadingStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use playability::GameStatus;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

const MAX_ATTEMPTS: u32 = 5;

/// Postgres-backed reading store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        info!("Database connection established");
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations completed");

        Ok(Self { pool })
    }
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    ts: DateTime<Utc>,
    temperature: f64,
    humidity: f64,
    air_quality: f64,
    status: String,
}

impl TryFrom<ReadingRow> for SensorReading {
    type Error = Error;

    fn try_from(row: ReadingRow) -> Result<Self> {
        let status: GameStatus = row
            .status
            .parse()
            .map_err(|e| Error::CorruptRow(format!("reading {}: {}", row.id, e)))?;

        Ok(SensorReading {
            id: row.id,
            temperature: row.temperature,
            humidity: row.humidity,
            air_quality: row.air_quality,
            status,
            timestamp: row.ts,
        })
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, record: ReadingRecord) -> Result<SensorReading> {
        let id = with_retry("insert", || insert_inner(&self.pool, &record)).await?;
        Ok(record.with_id(id))
    }

    async fn insert_batch(&self, batch: &[ReadingRecord]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        with_retry("batch insert", || insert_batch_inner(&self.pool, batch)).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<SensorReading>> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            "SELECT id, ts, temperature, humidity, air_quality, status
             FROM sensor_readings
             ORDER BY ts DESC, id DESC
             LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SensorReading::try_from).collect()
    }
}

async fn with_retry<T, F, Fut>(what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                DB_FAILURES_TOTAL.inc();
                match &e {
                    Error::Database(db_err) => {
                        if attempts >= MAX_ATTEMPTS || !is_transient_error(db_err) {
                            error!(
                                "Database {} failed permanently after {} attempts: {}",
                                what, attempts, e
                            );
                            return Err(e);
                        }

                        let wait_ms = 100 * 2_u64.pow(attempts - 1).min(32);
                        warn!(
                            "Database {} failed (attempt {}/{}), retrying in {}ms: {}",
                            what, attempts, MAX_ATTEMPTS, wait_ms, db_err
                        );
                        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    }
                    _ => {
                        error!("Database {} failed with non-database error: {}", what, e);
                        return Err(e);
                    }
                }
            }
        }
    }
}

async fn insert_inner(pool: &PgPool, record: &ReadingRecord) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO sensor_readings (ts, temperature, humidity, air_quality, status)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(record.timestamp)
    .bind(record.temperature)
    .bind(record.humidity)
    .bind(record.air_quality)
    .bind(record.status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

async fn insert_batch_inner(pool: &PgPool, batch: &[ReadingRecord]) -> Result<()> {
    let timestamps: Vec<DateTime<Utc>> = batch.iter().map(|r| r.timestamp).collect();
    let temperatures: Vec<f64> = batch.iter().map(|r| r.temperature).collect();
    let humidities: Vec<f64> = batch.iter().map(|r| r.humidity).collect();
    let air_qualities: Vec<f64> = batch.iter().map(|r| r.air_quality).collect();
    let statuses: Vec<&str> = batch.iter().map(|r| r.status.as_str()).collect();

    let query = r#"
        INSERT INTO sensor_readings (ts, temperature, humidity, air_quality, status)
        SELECT * FROM UNNEST($1::timestamptz[], $2::float8[], $3::float8[], $4::float8[], $5::text[])
        "#;

    sqlx::query(query)
        .bind(&timestamps)
        .bind(&temperatures)
        .bind(&humidities)
        .bind(&air_qualities)
        .bind(&statuses)
        .execute(pool)
        .await?;

    Ok(())
}

/// Errors raised before the statement reached the server. Anything later
/// (I/O, dropped connections) may follow a commit, and inserts are not
/// idempotent, so those are never replayed.
fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code == "08001" || // sqlclient_unable_to_establish_sqlconnection
            code == "08004" || // sqlserver_rejected_establishment_of_sqlconnection
            code == "57P03" || // cannot_connect_now
            code == "53300" // too_many_connections
        }),
        _ => false,
    }
}
