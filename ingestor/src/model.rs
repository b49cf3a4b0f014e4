use chrono::{DateTime, Utc};
use playability::{AirQualityDistribution, Conditions, GameStatus};
use serde::{Deserialize, Serialize};

/// Reading as posted by the sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReading {
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    /// Defaults to the time of ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewReading {
    pub fn conditions(&self) -> Conditions {
        Conditions::new(self.temperature, self.humidity, self.air_quality)
    }

    /// Stamps the reading with its status, computed once here and persisted.
    pub fn into_record(self, now: DateTime<Utc>) -> ReadingRecord {
        ReadingRecord {
            status: self.conditions().status(),
            temperature: self.temperature,
            humidity: self.humidity,
            air_quality: self.air_quality,
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

/// Evaluated reading waiting to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRecord {
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    pub status: GameStatus,
    pub timestamp: DateTime<Utc>,
}

impl ReadingRecord {
    pub fn with_id(self, id: i64) -> SensorReading {
        SensorReading {
            id,
            temperature: self.temperature,
            humidity: self.humidity,
            air_quality: self.air_quality,
            status: self.status,
            timestamp: self.timestamp,
        }
    }
}

/// Stored sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
    pub status: GameStatus,
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn conditions(&self) -> Conditions {
        Conditions::new(self.temperature, self.humidity, self.air_quality)
    }
}

/// Response to a posted reading
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub status: String,
    pub playable: bool,
    pub data: SensorReading,
}

/// REST API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadingsResponse {
    pub data: Vec<SensorReading>,
    pub total: usize,
    pub limit: usize,
}

/// Verdict for the newest reading
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentStatusResponse {
    pub status: GameStatus,
    pub label: String,
    pub headline: String,
    pub playable: bool,
    pub reading: SensorReading,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AirQualityResponse {
    pub distribution: AirQualityDistribution,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_uses_all_three_inputs() {
        let reading = NewReading {
            temperature: 22.0,
            humidity: 50.0,
            air_quality: 180.0,
            timestamp: None,
        };

        let record = reading.into_record(Utc::now());
        assert_eq!(record.status, GameStatus::Cancelled);
    }

    #[test]
    fn test_timestamp_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let reading = NewReading {
            temperature: 20.0,
            humidity: 40.0,
            air_quality: 20.0,
            timestamp: None,
        };

        assert_eq!(reading.into_record(now).timestamp, now);
    }

    #[test]
    fn test_explicit_timestamp_kept() {
        let sent = Utc.with_ymd_and_hms(2025, 3, 1, 11, 59, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let reading = NewReading {
            temperature: 20.0,
            humidity: 40.0,
            air_quality: 20.0,
            timestamp: Some(sent),
        };

        assert_eq!(reading.into_record(now).timestamp, sent);
    }

    #[test]
    fn test_parse_sensor_payload() {
        let reading: NewReading =
            serde_json::from_str(r#"{"temperature": 18.5, "humidity": 77, "air_quality": 12}"#)
                .unwrap();

        assert_eq!(reading.humidity, 77.0);
        assert!(reading.timestamp.is_none());
        assert_eq!(reading.conditions().status(), GameStatus::Postponed);
    }
}
