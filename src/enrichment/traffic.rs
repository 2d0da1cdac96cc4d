use reqwest::Url;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::Result;
use crate::config::TrafficConfig;
use crate::error::RouteError;
use crate::http::{join_url, send_json};
use crate::models::Place;

const SERVICE: &str = "Bing Maps Traffic API";

/// Traffic incidents from Bing Maps
pub struct TrafficClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl TrafficClient {
    pub fn new(client: ClientWithMiddleware, config: &TrafficConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    /// Incidents between the two raw endpoint strings
    #[instrument(skip_all, fields(start = %start, end = %end))]
    pub async fn incidents(&self, start: &Place, end: &Place) -> Result<Value> {
        let url = incidents_url(&self.base_url, start, end, &self.api_key)?;
        let traffic: Value = send_json(SERVICE, self.client.get(url)).await?;
        debug!(
            "Traffic status: {}",
            traffic.get("statusCode").unwrap_or(&serde_json::Value::Null)
        );
        Ok(traffic)
    }
}

/// The endpoints go into the path, so each one is percent-encoded on its own
fn incidents_url(base_url: &str, start: &Place, end: &Place, key: &str) -> Result<Url> {
    let path = format!(
        "/REST/v1/Traffic/Incidents/{},{}",
        urlencoding::encode(start.as_str()),
        urlencoding::encode(end.as_str())
    );
    Url::parse_with_params(&join_url(base_url, &path), [("key", key)])
        .map_err(|e| RouteError::config(format!("Invalid traffic URL: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incidents_url_encodes_each_endpoint() {
        let start = Place::parse("start", "Central Station, Sydney").unwrap();
        let end = Place::parse("end", "Bondi/Beach").unwrap();
        let url = incidents_url("http://dev.virtualearth.net", &start, &end, "k").unwrap();
        assert_eq!(
            url.as_str(),
            "http://dev.virtualearth.net/REST/v1/Traffic/Incidents/Central%20Station%2C%20Sydney,Bondi%2FBeach?key=k"
        );
    }
}
