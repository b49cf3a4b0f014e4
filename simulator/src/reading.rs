use chrono::{DateTime, Utc};
use playability::{Conditions, GameStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reading as the pitch-side sensor sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn conditions(&self) -> Conditions {
        Conditions::new(self.temperature, self.humidity, self.air_quality)
    }
}

/// Reading as returned by `GET /sensor-data`
#[derive(Debug, Clone, Deserialize)]
pub struct StoredReading {
    pub id: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    pub status: GameStatus,
    pub timestamp: DateTime<Utc>,
}

impl StoredReading {
    pub fn conditions(&self) -> Conditions {
        Conditions::new(self.temperature, self.humidity, self.air_quality)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadingsPage {
    pub data: Vec<StoredReading>,
}

/// Generates a reading; `outlier_ratio` of them fall outside fair conditions.
/// A NaN ratio means no outliers.
pub fn generate_reading(rng: &mut impl Rng, outlier_ratio: f64) -> Reading {
    let ratio = if outlier_ratio.is_nan() {
        0.0
    } else {
        outlier_ratio.clamp(0.0, 1.0)
    };
    let outlier = rng.gen_bool(ratio);

    let temperature = if outlier && rng.gen_bool(0.4) {
        if rng.gen_bool(0.5) {
            rng.gen_range(-15.0..0.0)
        } else {
            rng.gen_range(35.5..45.0)
        }
    } else {
        rng.gen_range(8.0..32.0)
    };

    let humidity = if outlier && rng.gen_bool(0.4) {
        rng.gen_range(75.5..100.0)
    } else {
        rng.gen_range(30.0..72.0)
    };

    let air_quality = if outlier && rng.gen_bool(0.4) {
        rng.gen_range(101.0..320.0)
    } else {
        rng.gen_range(5.0..95.0)
    };

    Reading {
        temperature,
        humidity,
        air_quality,
        timestamp: Utc::now(),
    }
}
