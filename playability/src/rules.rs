use crate::status::{Cause, GameStatus, Verdict};
use serde::{Deserialize, Serialize};

pub const TEMPERATURE_MIN_C: f64 = 0.0;
pub const TEMPERATURE_MAX_C: f64 = 35.0;
pub const HUMIDITY_CANCEL_PCT: f64 = 90.0;
pub const HUMIDITY_POSTPONE_PCT: f64 = 75.0;
/// AQI-like index (0-500 scale)
pub const AIR_QUALITY_CANCEL_INDEX: f64 = 100.0;

/// Decides whether a match may go ahead under the given conditions.
///
/// Total over every `f64`, NaN included: each threshold is a strict
/// comparison, so a NaN field never trips its rule.
pub fn evaluate(temperature: f64, humidity: f64, air_quality: f64) -> GameStatus {
    assess(temperature, humidity, air_quality).status
}

/// Like [`evaluate`], also reporting which rule fired.
pub fn assess(temperature: f64, humidity: f64, air_quality: f64) -> Verdict {
    // First match wins; temperature outranks everything else.
    if temperature < TEMPERATURE_MIN_C || temperature > TEMPERATURE_MAX_C {
        Verdict::stopped(GameStatus::Forfeited, Cause::ExtremeTemperature)
    } else if humidity > HUMIDITY_CANCEL_PCT {
        Verdict::stopped(GameStatus::Cancelled, Cause::HighHumidity)
    } else if humidity > HUMIDITY_POSTPONE_PCT {
        Verdict::stopped(GameStatus::Postponed, Cause::UnfavorableConditions)
    } else if air_quality > AIR_QUALITY_CANCEL_INDEX {
        Verdict::stopped(GameStatus::Cancelled, Cause::PoorAirQuality)
    } else {
        Verdict::ALLOWED
    }
}

/// Environmental conditions at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
}

impl Conditions {
    pub fn new(temperature: f64, humidity: f64, air_quality: f64) -> Self {
        Self {
            temperature,
            humidity,
            air_quality,
        }
    }

    pub fn status(&self) -> GameStatus {
        evaluate(self.temperature, self.humidity, self.air_quality)
    }

    pub fn verdict(&self) -> Verdict {
        assess(self.temperature, self.humidity, self.air_quality)
    }
}
