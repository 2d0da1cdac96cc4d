//! Geospatial data aggregation
//!
//! Turns a start/end pair into everything the report needs from Google Maps:
//! - the route (directions) and its first-leg distance
//! - waypoints sampled from each step polyline
//! - points of interest around the sampled waypoints
//! - geocoded endpoints and the mean elevation between them
//!
//! Directions come first and gate everything else. The route survey fans its
//! lookups out concurrently and joins them all-or-nothing.

pub mod directions;
pub mod elevation;
pub mod geocoding;
pub mod geometry;
pub mod places;

use futures::future::try_join_all;
use reqwest::Url;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde_json::Value;
use tracing::{info, instrument};

pub use directions::Directions;
pub use elevation::ElevationProfile;
pub use places::NearbyPlaces;

use crate::Result;
use crate::config::{AggregationConfig, GoogleConfig};
use crate::error::RouteError;
use crate::http::{join_url, send_json};
use crate::models::{Coordinates, Place};

/// Thin client over the Google Maps web services sharing one API key
#[derive(Clone)]
pub struct GoogleMaps {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl GoogleMaps {
    pub fn new(client: ClientWithMiddleware, config: &GoogleConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<RequestBuilder> {
        let url = Url::parse_with_params(
            &join_url(&self.base_url, path),
            params.iter().copied().chain([("key", self.api_key.as_str())]),
        )
        .map_err(|e| RouteError::config(format!("Invalid Google Maps URL: {e}")))?;
        Ok(self.client.get(url))
    }

    /// Fetch directions between two places
    #[instrument(skip_all, fields(start = %start, end = %end))]
    pub async fn directions(&self, start: &Place, end: &Place) -> Result<Directions> {
        let request = self.get(
            "/maps/api/directions/json",
            &[("origin", start.as_str()), ("destination", end.as_str())],
        )?;
        let raw: Value = send_json(directions::SERVICE, request).await?;
        Directions::from_value(raw)
    }
}

/// Everything the Google lookups contribute to a report
#[derive(Debug, Clone)]
pub struct GeospatialData {
    pub directions: Directions,
    pub places: Vec<NearbyPlaces>,
    pub start: Coordinates,
    pub end: Coordinates,
    pub elevation: ElevationProfile,
}

impl GeospatialData {
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.directions.distance_km()
    }

    #[must_use]
    pub fn average_elevation(&self) -> f64 {
        self.elevation.average()
    }
}

/// Route-dependent lookups: points of interest and the geocoded endpoints
#[derive(Debug, Clone)]
pub struct RouteSurvey {
    pub places: Vec<NearbyPlaces>,
    pub start: Coordinates,
    pub end: Coordinates,
}

pub struct GeospatialAggregator {
    maps: GoogleMaps,
    settings: AggregationConfig,
}

impl GeospatialAggregator {
    pub fn new(maps: GoogleMaps, settings: AggregationConfig) -> Self {
        Self { maps, settings }
    }

    /// Directions for the pair. A route-less answer fails with `NoRouteFound`.
    pub async fn route(&self, start: &Place, end: &Place) -> Result<Directions> {
        self.maps.directions(start, end).await
    }

    /// Places around the sampled waypoints and both geocoded endpoints
    #[instrument(skip_all, fields(start = %start, end = %end))]
    pub async fn survey(
        &self,
        directions: &Directions,
        start: &Place,
        end: &Place,
    ) -> Result<RouteSurvey> {
        let waypoints = directions.sampled_waypoints(self.settings.waypoint_stride)?;
        let targets = geometry::spread(&waypoints, self.settings.place_waypoints);
        info!(
            "Sampled {} waypoints, searching places around {}",
            waypoints.len(),
            targets.len()
        );

        let places_lookups = targets.into_iter().map(|waypoint| {
            self.maps.nearby_places(
                waypoint,
                self.settings.places_radius_m,
                self.settings.max_places,
            )
        });

        let (places, start_point, end_point) = futures::try_join!(
            try_join_all(places_lookups),
            self.maps.geocode(start),
            self.maps.geocode(end),
        )?;

        Ok(RouteSurvey {
            places,
            start: start_point,
            end: end_point,
        })
    }

    /// Elevation profile along the straight start/end line
    pub async fn elevation(&self, from: Coordinates, to: Coordinates) -> Result<ElevationProfile> {
        self.maps
            .elevation_along(from, to, self.settings.elevation_samples)
            .await
    }
}
