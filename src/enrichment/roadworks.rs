use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::Result;
use crate::config::RoadworksConfig;
use crate::http::send_json;

const SERVICE: &str = "Roadworks API";

/// Live roadworks hazards of one fixed regional authority
pub struct RoadworksClient {
    client: ClientWithMiddleware,
    url: String,
    token: String,
}

impl RoadworksClient {
    pub fn new(client: ClientWithMiddleware, config: &RoadworksConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            token: config.api_key.clone().unwrap_or_default(),
        }
    }

    /// The feed is not filtered by location
    #[instrument(skip_all)]
    pub async fn live(&self) -> Result<Value> {
        let request = self.client.get(&self.url).bearer_auth(&self.token);
        let roadworks: Value = send_json(SERVICE, request).await?;
        debug!(
            "Roadworks features: {}",
            roadworks
                .get("features")
                .and_then(serde_json::Value::as_array)
                .map_or(0, Vec::len)
        );
        Ok(roadworks)
    }
}
