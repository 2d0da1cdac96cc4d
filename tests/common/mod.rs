//! Shared setup for the router level tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use ridewise::{AppConfig, AppState, MemorySessionStore, web};
use serde_json::Value;

/// Configuration pointing every upstream at `upstream` (a mock server URL)
pub fn config_for(upstream: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.http.timeout_seconds = 5;
    config.http.max_retries = 0;
    config.http.pipeline_timeout_seconds = 20;
    config.session.secret_key = Some("integration-secret".to_string());

    config.google.base_url = upstream.to_string();
    config.google.api_key = Some("google-key".to_string());
    config.openai.base_url = upstream.to_string();
    config.openai.api_key = Some("openai-key".to_string());
    config.weather.base_url = upstream.to_string();
    config.weather.api_key = Some("weather-key".to_string());
    config.traffic.base_url = upstream.to_string();
    config.traffic.api_key = Some("bing-key".to_string());
    config.roadworks.url = format!("{upstream}/roadworks");
    config.roadworks.api_key = Some("sydney-key".to_string());
    config
}

pub fn app(config: AppConfig) -> Router {
    let state = AppState::new(config, Arc::new(MemorySessionStore::new()))
        .expect("state should build");
    web::router(state)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
