use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::{GoogleMaps, geometry};
use crate::Result;
use crate::error::RouteError;
use crate::http::send_json;
use crate::models::Coordinates;

const SERVICE: &str = "Google Elevation API";

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Vec<ElevationSample>,
}

#[derive(Debug, Deserialize)]
struct ElevationSample {
    elevation: f64,
}

/// Elevation samples along a straight path
#[derive(Debug, Clone)]
pub struct ElevationProfile {
    /// Untouched response body, forwarded to the summary prompt
    pub raw: Value,
    pub samples: Vec<f64>,
}

impl ElevationProfile {
    /// Arithmetic mean of the samples
    #[must_use]
    pub fn average(&self) -> f64 {
        mean(&self.samples).unwrap_or(0.0)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl GoogleMaps {
    /// Sample elevations along the straight line between two points
    #[instrument(skip(self))]
    pub async fn elevation_along(
        &self,
        from: Coordinates,
        to: Coordinates,
        samples: u32,
    ) -> Result<ElevationProfile> {
        let path = format!("enc:{}", geometry::encode(&[from, to])?);
        let samples_param = samples.to_string();
        let request = self.get(
            "/maps/api/elevation/json",
            &[("path", path.as_str()), ("samples", samples_param.as_str())],
        )?;
        let raw: Value = send_json(SERVICE, request).await?;

        let response: ElevationResponse = serde_json::from_value(raw.clone())
            .map_err(|e| RouteError::upstream(SERVICE, format!("unexpected response: {e}")))?;

        if response.results.is_empty() {
            return Err(RouteError::upstream(
                SERVICE,
                format!(
                    "no elevation samples returned ({})",
                    response.status.as_deref().unwrap_or("no status")
                ),
            ));
        }

        let samples: Vec<f64> = response.results.iter().map(|s| s.elevation).collect();
        let profile = ElevationProfile { raw, samples };
        info!(
            "Received {} elevation samples, mean {:.1}m",
            profile.samples.len(),
            profile.average()
        );
        Ok(profile)
    }
}
