//! Google Directions API response model

use serde::Deserialize;
use serde_json::Value;

use super::geometry;
use crate::Result;
use crate::error::RouteError;
use crate::models::Coordinates;

pub(crate) const SERVICE: &str = "Google Directions API";

#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    pub distance: Distance,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Distance {
    /// Meters
    pub value: f64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub polyline: EncodedPolyline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncodedPolyline {
    pub points: String,
}

/// A directions lookup with at least one route
#[derive(Debug, Clone)]
pub struct Directions {
    /// Untouched response body, forwarded to the summary prompt
    pub raw: Value,
    pub route: Route,
}

impl Directions {
    /// Validate a raw directions body; an empty route set is `NoRouteFound`
    pub fn from_value(raw: Value) -> Result<Self> {
        let response: DirectionsResponse = serde_json::from_value(raw.clone())
            .map_err(|e| RouteError::upstream(SERVICE, format!("unexpected response: {e}")))?;

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or(RouteError::NoRouteFound)?;

        if route.legs.is_empty() {
            return Err(RouteError::upstream(SERVICE, "route has no legs"));
        }

        Ok(Self { raw, route })
    }

    fn first_leg(&self) -> &Leg {
        &self.route.legs[0]
    }

    /// Distance of the first leg in kilometers
    #[must_use]
    pub fn distance_km(&self) -> f64 {
        self.first_leg().distance.value / 1000.0
    }

    /// Decode each step of the first leg and keep every `stride`-th point of
    /// each step, in travel order
    pub fn sampled_waypoints(&self, stride: usize) -> Result<Vec<Coordinates>> {
        let mut waypoints = Vec::new();
        for step in &self.first_leg().steps {
            let points = geometry::decode(&step.polyline.points)?;
            waypoints.extend(geometry::sample_every(&points, stride));
        }
        Ok(waypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directions_body() -> Value {
        json!({
            "status": "OK",
            "routes": [{
                "legs": [{
                    "distance": { "text": "12.3 km", "value": 12345 },
                    "steps": [
                        { "polyline": { "points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@" } },
                        { "polyline": { "points": "_p~iF~ps|U" } }
                    ]
                }]
            }]
        })
    }

    #[test]
    fn test_empty_routes_is_no_route_found() {
        let err = Directions::from_value(json!({"status": "ZERO_RESULTS", "routes": []}))
            .unwrap_err();
        assert!(matches!(err, RouteError::NoRouteFound));
    }

    #[test]
    fn test_missing_routes_is_no_route_found() {
        let err = Directions::from_value(json!({"status": "REQUEST_DENIED"})).unwrap_err();
        assert!(matches!(err, RouteError::NoRouteFound));
    }

    #[test]
    fn test_distance_km_uses_first_leg_meters() {
        let directions = Directions::from_value(directions_body()).unwrap();
        assert!((directions.distance_km() - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_sampled_waypoints_take_first_point_of_each_step() {
        let directions = Directions::from_value(directions_body()).unwrap();
        let waypoints = directions.sampled_waypoints(20).unwrap();
        assert_eq!(waypoints.len(), 2);
        assert!((waypoints[0].latitude - 38.5).abs() < 1e-6);
        assert!((waypoints[1].longitude + 120.2).abs() < 1e-6);
    }

    #[test]
    fn test_stride_of_one_keeps_every_point() {
        let directions = Directions::from_value(directions_body()).unwrap();
        assert_eq!(directions.sampled_waypoints(1).unwrap().len(), 4);
    }
}
