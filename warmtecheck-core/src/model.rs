use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::heating::heating_index;

/// A named forecast target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self { name: name.into(), lat, lon }
    }

    /// Returns a description of the first violated constraint, if any.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("location name must not be empty".to_string());
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} of '{}' is outside [-90, 90]", self.lat, self.name));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!(
                "longitude {} of '{}' is outside [-180, 180]",
                self.lon, self.name
            ));
        }
        Ok(())
    }
}

/// Validate a whole location set; an empty set is rejected.
pub fn validate_locations(locations: &[Location]) -> Result<(), String> {
    if locations.is_empty() {
        return Err("at least one location is required".to_string());
    }
    locations.iter().try_for_each(Location::validate)
}

/// Default location set used when nothing else is configured.
pub fn default_locations() -> Vec<Location> {
    vec![Location::new("Eindhoven", 51.4416, 5.4697), Location::new("Utrecht", 52.0907, 5.1214)]
}

/// One hour of raw forecast. `time` is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    pub time: String,
    pub temp: f64,
}

impl HourlyReading {
    pub fn new(time: impl Into<String>, temp: f64) -> Self {
        Self { time: time.into(), temp }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: String,
    pub temp: f64,
    pub heating_index: f64,
}

impl From<HourlyReading> for ForecastEntry {
    fn from(reading: HourlyReading) -> Self {
        let heating_index = heating_index(reading.temp);
        Self { time: reading.time, temp: reading.temp, heating_index }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    pub place: String,
    pub forecast: Vec<ForecastEntry>,
}

/// The persisted output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub results: Vec<LocationReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_report() -> RunReport {
        RunReport {
            generated_at: Utc.with_ymd_and_hms(2023, 1, 1, 11, 59, 30).unwrap(),
            results: vec![LocationReport {
                place: "Eindhoven".into(),
                forecast: vec![
                    HourlyReading::new("2023-01-01T12:00", 15.0).into(),
                    HourlyReading::new("2023-01-01T13:00", 21.25).into(),
                ],
            }],
        }
    }

    #[test]
    fn entry_from_reading_applies_heating_index() {
        let entry = ForecastEntry::from(HourlyReading::new("2023-01-01T12:00", 15.0));
        assert_eq!(
            entry,
            ForecastEntry { time: "2023-01-01T12:00".into(), temp: 15.0, heating_index: 5.0 }
        );
    }

    #[test]
    fn report_serializes_to_wire_shape() {
        let value = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(
            value,
            json!({
                "generated_at": "2023-01-01T11:59:30Z",
                "results": [{
                    "place": "Eindhoven",
                    "forecast": [
                        { "time": "2023-01-01T12:00", "temp": 15.0, "heating_index": 5.0 },
                        { "time": "2023-01-01T13:00", "temp": 21.25, "heating_index": 0.0 }
                    ]
                }]
            })
        );
    }

    #[test]
    fn report_survives_json_roundtrip() {
        let report = sample_report();
        let text = serde_json::to_string_pretty(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn location_validation() {
        assert!(Location::new("Eindhoven", 51.44, 5.47).validate().is_ok());
        assert!(Location::new("Pole", 90.0, -180.0).validate().is_ok());

        let err = Location::new("  ", 0.0, 0.0).validate().unwrap_err();
        assert!(err.contains("name"));
        let err = Location::new("Nowhere", 91.0, 0.0).validate().unwrap_err();
        assert!(err.contains("latitude"));
        let err = Location::new("Nowhere", 0.0, -180.5).validate().unwrap_err();
        assert!(err.contains("longitude"));
    }

    #[test]
    fn empty_location_set_is_rejected() {
        assert!(validate_locations(&[]).is_err());
        assert!(validate_locations(&default_locations()).is_ok());
    }
}
