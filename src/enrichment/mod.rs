//! Context enrichment: weather at the start point, traffic incidents between
//! the endpoints and the regional roadworks feed.
//!
//! The payloads are not interpreted; they travel into the report and the
//! summary prompt as returned by the providers.

mod roadworks;
mod traffic;
mod weather;

use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tracing::instrument;

pub use roadworks::RoadworksClient;
pub use traffic::TrafficClient;
pub use weather::WeatherClient;

use crate::Result;
use crate::config::AppConfig;
use crate::models::{Coordinates, Place};

/// The three context payloads of one report
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub weather: Value,
    pub traffic: Value,
    pub roadworks: Value,
}

pub struct ContextEnrichment {
    weather: WeatherClient,
    traffic: TrafficClient,
    roadworks: RoadworksClient,
}

impl ContextEnrichment {
    pub fn new(client: ClientWithMiddleware, config: &AppConfig) -> Self {
        Self {
            weather: WeatherClient::new(client.clone(), &config.weather),
            traffic: TrafficClient::new(client.clone(), &config.traffic),
            roadworks: RoadworksClient::new(client, &config.roadworks),
        }
    }

    /// Traffic incidents and roadworks; neither needs geocoded input
    #[instrument(skip_all, fields(start = %start, end = %end))]
    pub async fn road_conditions(&self, start: &Place, end: &Place) -> Result<(Value, Value)> {
        futures::try_join!(self.traffic.incidents(start, end), self.roadworks.live())
    }

    /// Current weather at the geocoded start
    pub async fn weather(&self, start_point: Coordinates) -> Result<Value> {
        self.weather.current(start_point).await
    }
}
