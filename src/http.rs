//! Outbound HTTP plumbing shared by every upstream API client
//!
//! All calls go through a `reqwest` client wrapped with a retry middleware
//! (exponential backoff on transient failures) and a per-call timeout.
//! Non-success statuses and unparsable bodies are mapped onto
//! [`RouteError::Upstream`] tagged with the service name.

use std::time::{Duration, Instant};

use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::Result;
use crate::config::HttpConfig;
use crate::error::RouteError;

const USER_AGENT: &str = concat!("ridewise/", env!("CARGO_PKG_VERSION"));

/// Build the shared upstream client
pub fn build_client(config: &HttpConfig) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| RouteError::config(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(250), Duration::from_secs(8))
        .build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Send a request and decode the JSON body, mapping failures for `service`
pub async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: RequestBuilder,
) -> Result<T> {
    let started = Instant::now();
    let response = request.send().await.map_err(|e| {
        error!("{} request failed: {}", service, e);
        RouteError::upstream(service, format!("request failed: {e}"))
    })?;

    let response = check_status(service, response).await?;

    let value = response.json::<T>().await.map_err(|e| {
        error!("Failed to parse {} response: {}", service, e);
        RouteError::upstream(service, format!("invalid JSON response: {e}"))
    })?;

    let elapsed = started.elapsed();
    debug!("{} responded in {:.3}s", service, elapsed.as_secs_f64());
    if elapsed.as_secs() > 5 {
        warn!("Slow {} response: {:.3}s", service, elapsed.as_secs_f64());
    }

    Ok(value)
}

async fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("{} returned HTTP {}: {}", service, status, body);

    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication failed (HTTP {}), check the API key", status.as_u16())
        }
        StatusCode::TOO_MANY_REQUESTS => "rate limit exceeded (HTTP 429)".to_string(),
        _ => format!(
            "HTTP {} - {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        ),
    };
    Err(RouteError::upstream(service, message))
}

/// Join a configured base URL and a path without doubling slashes
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://maps.googleapis.com", "/maps/api/geocode/json")]
    #[case("https://maps.googleapis.com/", "maps/api/geocode/json")]
    #[case("https://maps.googleapis.com/", "/maps/api/geocode/json")]
    fn test_join_url(#[case] base: &str, #[case] path: &str) {
        assert_eq!(
            join_url(base, path),
            "https://maps.googleapis.com/maps/api/geocode/json"
        );
    }

    #[tokio::test]
    async fn test_non_success_status_maps_to_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/weather")
            .with_status(401)
            .with_body(r#"{"cod":401}"#)
            .create_async()
            .await;

        let client = build_client(&HttpConfig {
            timeout_seconds: 5,
            max_retries: 0,
            pipeline_timeout_seconds: 10,
        })
        .unwrap();
        let result: Result<serde_json::Value> = send_json(
            "OpenWeatherMap API",
            client.get(join_url(&server.url(), "/weather")),
        )
        .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert!(matches!(err, RouteError::Upstream { service: "OpenWeatherMap API", .. }));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn test_malformed_json_maps_to_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/hazards")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = build_client(&HttpConfig {
            timeout_seconds: 5,
            max_retries: 0,
            pipeline_timeout_seconds: 10,
        })
        .unwrap();
        let result: Result<serde_json::Value> =
            send_json("Roadworks API", client.get(join_url(&server.url(), "/hazards"))).await;

        assert!(result.unwrap_err().to_string().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn test_transient_status_is_retried_up_to_the_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/directions")
            .expect(3)
            .with_status(503)
            .create_async()
            .await;

        let client = build_client(&HttpConfig {
            timeout_seconds: 5,
            max_retries: 2,
            pipeline_timeout_seconds: 10,
        })
        .unwrap();
        let result: Result<serde_json::Value> = send_json(
            "Google Directions API",
            client.get(join_url(&server.url(), "/directions")),
        )
        .await;

        mock.assert_async().await;
        assert!(result.unwrap_err().to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/geocode")
            .expect(1)
            .with_status(404)
            .create_async()
            .await;

        let client = build_client(&HttpConfig {
            timeout_seconds: 5,
            max_retries: 2,
            pipeline_timeout_seconds: 10,
        })
        .unwrap();
        let result: Result<serde_json::Value> = send_json(
            "Google Geocoding API",
            client.get(join_url(&server.url(), "/geocode")),
        )
        .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }
}
