//! Geographic coordinates and free-text route endpoints

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::RouteError;

/// Latitude/longitude pair in decimal degrees
///
/// Used both for geocoded route endpoints and for waypoints decoded from a
/// step polyline.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `lat,lng` as expected by the Google location parameters
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A route endpoint as typed by the user: an address or `"lat,lng"`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Place(String);

impl Place {
    /// Accepts any non-blank string; surrounding whitespace is dropped.
    pub fn parse(field: &str, input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RouteError::validation(format!("{field} location cannot be empty")));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_query_format() {
        let point = Coordinates::new(-33.8688, 151.2093);
        assert_eq!(point.to_query(), "-33.8688,151.2093");
        assert_eq!(point.format_coordinates(), "-33.8688, 151.2093");
    }

    #[test]
    fn test_place_rejects_blank_input() {
        assert!(Place::parse("start", "").is_err());
        assert!(Place::parse("end", "   ").is_err());
        let place = Place::parse("start", "  Bondi Beach ").unwrap();
        assert_eq!(place.as_str(), "Bondi Beach");
    }
}
