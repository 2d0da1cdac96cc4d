use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::GoogleMaps;
use crate::Result;
use crate::http::send_json;
use crate::models::Coordinates;

const SERVICE: &str = "Google Places API";

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// Points of interest found around one sampled waypoint
#[derive(Debug, Clone, Serialize)]
pub struct NearbyPlaces {
    pub waypoint: Coordinates,
    pub results: Vec<Value>,
}

impl GoogleMaps {
    /// Nearby search around `waypoint`, keeping at most `limit` results
    #[instrument(skip_all, fields(waypoint = %waypoint.format_coordinates(), radius_m = radius_m))]
    pub async fn nearby_places(
        &self,
        waypoint: Coordinates,
        radius_m: u32,
        limit: usize,
    ) -> Result<NearbyPlaces> {
        let location = waypoint.to_query();
        let radius = radius_m.to_string();
        let request = self.get(
            "/maps/api/place/nearbysearch/json",
            &[("location", location.as_str()), ("radius", radius.as_str())],
        )?;
        let response: NearbySearchResponse = send_json(SERVICE, request).await?;

        let mut results = response.results;
        results.truncate(limit);
        debug!("Found {} places", results.len());

        Ok(NearbyPlaces { waypoint, results })
    }
}
