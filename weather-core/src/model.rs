use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// Latitude/longitude pair in decimal degrees, range-checked on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        // NaN fails both range checks.
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(WeatherError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Formats as `lat,lon`, the key shape of the upstream `points` resource.
impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

/// Opaque upstream location identifier for the single-stage forecast path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationToken(String);

impl LocationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LocationToken {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::EmptyLocation);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for LocationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a forecast should be looked up. The two variants hit different
/// upstream resources and are never inferred from one another.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinates(Coordinates),
    Token(LocationToken),
}

impl From<Coordinates> for LocationQuery {
    fn from(value: Coordinates) -> Self {
        LocationQuery::Coordinates(value)
    }
}

impl From<LocationToken> for LocationQuery {
    fn from(value: LocationToken) -> Self {
        LocationQuery::Token(value)
    }
}

/// Two-letter state/territory code used by the alerts-by-area resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RegionCode {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(WeatherError::InvalidRegion(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of `properties.periods` in a forecast payload.
///
/// The first six fields are required; a period without them is rejected
/// rather than rendered with blanks. The optional fields are carried through
/// for structured output only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: String,
    pub temperature: i64,
    pub temperature_unit: String,
    pub wind_speed: String,
    pub wind_direction: String,
    pub detailed_forecast: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_daytime: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_forecast: Option<String>,
}

/// Alerts-by-area response. `features` may be missing or `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertCollection {
    #[serde(default)]
    pub features: Option<Vec<AlertFeature>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFeature {
    #[serde(default)]
    pub properties: AlertProperties,
}

/// Every field is optional upstream; see [`crate::alerts::format_alert`] for defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProperties {
    pub event: Option<String>,
    pub area_desc: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
}
