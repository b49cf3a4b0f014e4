//! Playability rules for a football pitch.
//!
//! One reading (temperature, humidity, air quality) maps to one [`GameStatus`].
//! The ingestor stamps stored readings with it and every display surface
//! recomputes labels with it, so both always agree.

mod air_quality;
mod rules;
mod status;

pub use air_quality::{AirQualityBand, AirQualityDistribution};
pub use rules::{
    assess, evaluate, Conditions, AIR_QUALITY_CANCEL_INDEX, HUMIDITY_CANCEL_PCT,
    HUMIDITY_POSTPONE_PCT, TEMPERATURE_MAX_C, TEMPERATURE_MIN_C,
};
pub use status::{Cause, GameStatus, ParseStatusError, Verdict};
