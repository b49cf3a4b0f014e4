use serde::{Deserialize, Serialize};

/// Coarse AQI bands shown on the air quality dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityBand {
    Good,
    Moderate,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AirQualityBand {
    /// Upper bounds are inclusive. Like the cancel rule, each band is a
    /// strict "exceeds" test, so NaN exceeds nothing and lands in `Good`.
    pub fn classify(index: f64) -> Self {
        if index > 200.0 {
            AirQualityBand::Hazardous
        } else if index > 150.0 {
            AirQualityBand::VeryUnhealthy
        } else if index > 100.0 {
            AirQualityBand::Unhealthy
        } else if index > 50.0 {
            AirQualityBand::Moderate
        } else {
            AirQualityBand::Good
        }
    }

    /// Bands at or above this one cancel play on air quality alone.
    pub fn stops_play(self) -> bool {
        matches!(
            self,
            AirQualityBand::Unhealthy | AirQualityBand::VeryUnhealthy | AirQualityBand::Hazardous
        )
    }
}

/// Reading counts per band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQualityDistribution {
    pub good: usize,
    pub moderate: usize,
    pub unhealthy: usize,
    pub very_unhealthy: usize,
    pub hazardous: usize,
}

impl AirQualityDistribution {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut dist = Self::default();
        for value in values {
            dist.record(AirQualityBand::classify(value));
        }
        dist
    }

    pub fn record(&mut self, band: AirQualityBand) {
        match band {
            AirQualityBand::Good => self.good += 1,
            AirQualityBand::Moderate => self.moderate += 1,
            AirQualityBand::Unhealthy => self.unhealthy += 1,
            AirQualityBand::VeryUnhealthy => self.very_unhealthy += 1,
            AirQualityBand::Hazardous => self.hazardous += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.good + self.moderate + self.unhealthy + self.very_unhealthy + self.hazardous
    }
}
