use crate::config::QueryLimits;
use crate::errors::Error;
use crate::metrics;
use crate::model::{
    AirQualityResponse, CurrentStatusResponse, IngestResponse, NewReading, ReadingsResponse,
};
use crate::store::ReadingStore;
use crate::validate::validate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use playability::AirQualityDistribution;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ReadingStore>,
    limits: QueryLimits,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    limit: Option<usize>,
}

pub fn create_router(store: Arc<dyn ReadingStore>, limits: QueryLimits) -> Router {
    let state = AppState { store, limits };

    Router::new()
        .route("/", get(welcome))
        .route("/ping", get(ping))
        .route("/metrics", get(metrics_handler))
        .route("/sensor-data", get(get_readings).post(post_reading))
        .route("/sensor-data/status", get(get_current_status))
        .route("/sensor-data/air-quality", get(get_air_quality))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn welcome() -> &'static str {
    "Welcome to pitchside! The playability service is up and running."
}

async fn ping() -> &'static str {
    "PONG"
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

async fn post_reading(
    State(state): State<AppState>,
    Json(reading): Json<NewReading>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    // Overflowing numbers are already rejected by the JSON extractor.
    validate(&reading)?;

    let verdict = reading.conditions().verdict();
    let record = reading.into_record(Utc::now());

    let start = Instant::now();
    let stored = state.store.insert(record).await?;
    metrics::INGEST_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());
    metrics::record_accepted("http", stored.status);

    info!(id = stored.id, status = %stored.status, "Stored sensor reading");

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            message: "Data saved successfully".to_string(),
            status: verdict.label(),
            playable: verdict.is_playable(),
            data: stored,
        }),
    ))
}

async fn get_readings(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<ReadingsResponse>, AppError> {
    let limit = state.limits.clamp(params.limit);
    let readings = state.store.recent(limit).await?;

    Ok(Json(ReadingsResponse {
        total: readings.len(),
        data: readings,
        limit,
    }))
}

async fn get_current_status(
    State(state): State<AppState>,
) -> Result<Json<CurrentStatusResponse>, AppError> {
    let latest = state
        .store
        .recent(1)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("no sensor readings yet"))?;

    let verdict = latest.conditions().verdict();

    Ok(Json(CurrentStatusResponse {
        status: verdict.status,
        label: verdict.label(),
        headline: verdict.headline().to_string(),
        playable: verdict.is_playable(),
        reading: latest,
    }))
}

async fn get_air_quality(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<AirQualityResponse>, AppError> {
    let limit = state.limits.clamp(params.limit);
    let readings = state.store.recent(limit).await?;
    let distribution = AirQualityDistribution::from_values(readings.iter().map(|r| r.air_quality));

    Ok(Json(AirQualityResponse {
        total: distribution.total(),
        distribution,
    }))
}

enum AppError {
    Invalid(String),
    NotFound(&'static str),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.to_string()),
            AppError::Internal(err) => {
                error!("API error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong, please try again later.".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => AppError::Invalid(msg),
            other => AppError::Internal(other.into()),
        }
    }
}
