//! Latitude/longitude input for prediction requests.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolarDetectError};

/// Coordinate axis, each with its own valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn limit(&self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }
}

/// Parse a user-typed coordinate. Accepts a decimal comma ("-23,5").
///
/// Returns `None` for empty, non-numeric, non-finite or out-of-range input.
pub fn parse_coordinate(raw: &str, axis: Axis) -> Option<f64> {
    let normalized = raw.trim().replacen(',', ".", 1);
    if normalized.is_empty() {
        return None;
    }

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let limit = axis.limit();
    if value < -limit || value > limit {
        return None;
    }
    Some(value)
}

/// A validated point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        let valid_lat = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        let valid_lon = lon.is_finite() && (-180.0..=180.0).contains(&lon);
        if !(valid_lat && valid_lon) {
            return Err(out_of_range());
        }
        Ok(Self { lat, lon })
    }

    pub fn parse(lat: &str, lon: &str) -> Result<Self> {
        match (
            parse_coordinate(lat, Axis::Latitude),
            parse_coordinate(lon, Axis::Longitude),
        ) {
            (Some(lat), Some(lon)) => Ok(Self { lat, lon }),
            _ => Err(out_of_range()),
        }
    }

    /// Query parameters with six decimal places, as the API expects.
    pub fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("lat", format!("{:.6}", self.lat)),
            ("lon", format!("{:.6}", self.lon)),
        ]
    }
}

fn out_of_range() -> SolarDetectError {
    SolarDetectError::InvalidInput(
        "latitude must be between -90 and 90 and longitude between -180 and 180".to_string(),
    )
}
