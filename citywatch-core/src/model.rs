use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-side city identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub u64);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for CityId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// One row of the static city directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityDirectoryEntry {
    pub id: CityId,
    pub name: String,
    pub country: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub state: Option<String>,
}

impl CityDirectoryEntry {
    pub fn new(id: u64, name: &str, country: &str, state: Option<&str>) -> Self {
        Self {
            id: CityId(id),
            name: name.to_string(),
            country: country.to_string(),
            state: state.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }
}

/// Current conditions as decoded from the weather endpoint.
#[derive(Debug, Clone)]
pub struct WeatherReading {
    pub city_id: CityId,
    pub name: String,
    pub country: String,
    pub description: String,
    pub icon: String,
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Local time at which the response was received.
    pub received_at: DateTime<Local>,
}

/// A tracked city with its latest weather snapshot.
///
/// Field names on disk follow the layout `{ id, cityName, country, state,
/// description, icon, currentTemp, feelsLike, minTemp, maxTemp, date }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub id: CityId,
    pub city_name: String,
    pub country: String,
    #[serde(default)]
    pub state: String,
    pub description: String,
    pub icon: String,
    #[serde(rename = "currentTemp")]
    pub current_temp_c: i32,
    #[serde(rename = "feelsLike")]
    pub feels_like_c: i32,
    #[serde(rename = "minTemp")]
    pub min_temp_c: i32,
    #[serde(rename = "maxTemp")]
    pub max_temp_c: i32,
    #[serde(rename = "date")]
    pub last_updated: String,
}

impl WatchlistEntry {
    /// Build a fresh entry from the selected directory row and a reading.
    pub fn from_reading(candidate: &CityDirectoryEntry, reading: &WeatherReading) -> Self {
        let mut entry = Self {
            id: candidate.id,
            city_name: candidate.name.clone(),
            country: candidate.country.clone(),
            state: candidate.state.clone().unwrap_or_default(),
            description: String::new(),
            icon: String::new(),
            current_temp_c: 0,
            feels_like_c: 0,
            min_temp_c: 0,
            max_temp_c: 0,
            last_updated: String::new(),
        };
        entry.apply_reading(reading);
        entry
    }

    /// Overwrite the weather fields and timestamp, leaving identity untouched.
    pub fn apply_reading(&mut self, reading: &WeatherReading) {
        self.description = reading.description.clone();
        self.icon = reading.icon.clone();
        self.current_temp_c = truncate_temp(reading.temp);
        self.feels_like_c = truncate_temp(reading.feels_like);
        self.min_temp_c = truncate_temp(reading.temp_min);
        self.max_temp_c = truncate_temp(reading.temp_max);
        self.last_updated = format_timestamp(&reading.received_at);
    }

    /// `"name, state"` when a state is known, otherwise just the name.
    pub fn display_name(&self) -> String {
        if self.state.is_empty() {
            self.city_name.clone()
        } else {
            format!("{}, {}", self.city_name, self.state)
        }
    }
}

/// Truncate toward zero; `NaN` becomes 0.
pub fn truncate_temp(value: f64) -> i32 {
    value.trunc() as i32
}

/// `dd/MM/yy HH:mm`, zero-padded.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%d/%m/%y %H:%M").to_string()
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
