use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::{info, instrument};

use crate::Result;
use crate::config::WeatherConfig;
use crate::error::RouteError;
use crate::http::{join_url, send_json};
use crate::models::Coordinates;

const SERVICE: &str = "OpenWeatherMap API";

/// Current conditions from OpenWeatherMap
pub struct WeatherClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(client: ClientWithMiddleware, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    /// Current weather at `point`
    #[instrument(skip_all, fields(point = %point.format_coordinates()))]
    pub async fn current(&self, point: Coordinates) -> Result<Value> {
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();
        let url = Url::parse_with_params(
            &join_url(&self.base_url, "/data/2.5/weather"),
            [
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
            ],
        )
        .map_err(|e| RouteError::config(format!("Invalid weather URL: {e}")))?;

        let weather: Value = send_json(SERVICE, self.client.get(url)).await?;
        info!(
            "Current weather: {}",
            weather
                .pointer("/weather/0/description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown")
        );
        Ok(weather)
    }
}
