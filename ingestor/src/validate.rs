use crate::errors::{Error, Result};
use crate::model::NewReading;

/// Rejects readings that cannot be stored or compared meaningfully.
///
/// serde_json never yields a non-finite `f64` (`1e400` fails to parse), so
/// for JSON payloads this is a guard only; it matters for readings built in
/// code. Ranges are not enforced: humidity above 100 or a negative index
/// still gets a status.
pub fn validate(reading: &NewReading) -> Result<()> {
    let fields = [
        ("temperature", reading.temperature),
        ("humidity", reading.humidity),
        ("air_quality", reading.air_quality),
    ];

    for (name, value) in fields {
        if !value.is_finite() {
            return Err(Error::Validation(format!("{} must be a finite number, got {}", name, value)));
        }
    }

    Ok(())
}
