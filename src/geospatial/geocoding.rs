use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::GoogleMaps;
use crate::Result;
use crate::error::RouteError;
use crate::http::send_json;
use crate::models::{Coordinates, Place};

const SERVICE: &str = "Google Geocoding API";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: Option<String>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GoogleMaps {
    /// Resolve a free-text place to the coordinates of its best match
    #[instrument(skip_all, fields(place = %place))]
    pub async fn geocode(&self, place: &Place) -> Result<Coordinates> {
        let request = self
            .get("/maps/api/geocode/json", &[("address", place.as_str())])?;
        let response: GeocodeResponse = send_json(SERVICE, request).await?;

        let Some(best) = response.results.into_iter().next() else {
            warn!("No geocoding results for '{}'", place);
            let reason = response
                .error_message
                .or(response.status)
                .unwrap_or_else(|| "no results".to_string());
            return Err(RouteError::upstream(
                SERVICE,
                format!("could not geocode '{place}': {reason}"),
            ));
        };

        let point = Coordinates::new(best.geometry.location.lat, best.geometry.location.lng);
        info!(
            "Geocoded '{}' to {} ({})",
            place,
            point.format_coordinates(),
            best.formatted_address.as_deref().unwrap_or("unnamed")
        );
        Ok(point)
    }
}
