//! Configuration management for the route report service
//!
//! Settings come from the process environment (optionally seeded from a
//! `.env` file) through the `config` crate. Every upstream credential is
//! optional at startup; a missing key only degrades the feature that needs it.

use crate::error::RouteError;
use ::config::{Config, Environment, Map};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
    pub google: GoogleConfig,
    pub openai: OpenAiConfig,
    pub weather: WeatherConfig,
    pub traffic: TrafficConfig,
    pub roadworks: RoadworksConfig,
    pub aggregation: AggregationConfig,
    pub logging: LoggingConfig,
}

/// Listener and public URL settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Externally reachable base URL, used for OAuth redirects
    pub public_url: String,
    /// Directory served for unmatched paths
    pub static_dir: String,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    /// Per-request server timeout in seconds
    pub request_timeout_seconds: u64,
}

/// OpenID Connect provider (Auth0 style tenant)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub domain: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key used to sign session cookies
    pub secret_key: Option<String>,
}

/// Outbound HTTP client settings shared by every upstream API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout in seconds
    pub timeout_seconds: u64,
    /// Retries on transient failures (exponential backoff)
    pub max_retries: u32,
    /// Deadline for a whole route report
    pub pipeline_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Token budget of the summarization prompt
    pub max_prompt_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadworksConfig {
    /// Bearer token for the regional roadworks feed
    pub api_key: Option<String>,
    pub url: String,
}

/// Tuning knobs of the geospatial aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Keep every n-th decoded polyline point as a waypoint
    pub waypoint_stride: usize,
    /// Number of sampled waypoints to search places around
    pub place_waypoints: usize,
    pub places_radius_m: u32,
    pub max_places: usize,
    pub elevation_samples: u32,
    pub calories_per_km: f64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
    /// OTLP/HTTP collector endpoint, trace export is off when unset
    pub otlp_endpoint: Option<String>,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_request_timeout() -> u64 {
    180
}

fn default_http_timeout() -> u64 {
    30
}

fn default_http_max_retries() -> u32 {
    3
}

fn default_pipeline_timeout() -> u64 {
    150
}

fn default_google_base_url() -> String {
    "https://maps.googleapis.com".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo-16k".to_string()
}

fn default_max_prompt_tokens() -> usize {
    15_000
}

fn default_weather_base_url() -> String {
    "http://api.openweathermap.org".to_string()
}

fn default_traffic_base_url() -> String {
    "http://dev.virtualearth.net".to_string()
}

fn default_roadworks_url() -> String {
    "https://api.transport.nsw.gov.au/v1/live/hazards/roadwork/all".to_string()
}

fn default_waypoint_stride() -> usize {
    20
}

fn default_place_waypoints() -> usize {
    5
}

fn default_places_radius() -> u32 {
    5000
}

fn default_max_places() -> usize {
    20
}

fn default_elevation_samples() -> u32 {
    100
}

fn default_calories_per_km() -> f64 {
    50.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: default_port(),
                public_url: format!("http://localhost:{}", default_port()),
                static_dir: default_static_dir(),
                tls_cert_path: None,
                tls_key_path: None,
                request_timeout_seconds: default_request_timeout(),
            },
            identity: IdentityConfig {
                domain: None,
                client_id: None,
                client_secret: None,
            },
            session: SessionConfig { secret_key: None },
            http: HttpConfig {
                timeout_seconds: default_http_timeout(),
                max_retries: default_http_max_retries(),
                pipeline_timeout_seconds: default_pipeline_timeout(),
            },
            google: GoogleConfig {
                api_key: None,
                base_url: default_google_base_url(),
            },
            openai: OpenAiConfig {
                api_key: None,
                base_url: default_openai_base_url(),
                model: default_openai_model(),
                max_prompt_tokens: default_max_prompt_tokens(),
            },
            weather: WeatherConfig {
                api_key: None,
                base_url: default_weather_base_url(),
            },
            traffic: TrafficConfig {
                api_key: None,
                base_url: default_traffic_base_url(),
            },
            roadworks: RoadworksConfig {
                api_key: None,
                url: default_roadworks_url(),
            },
            aggregation: AggregationConfig {
                waypoint_stride: default_waypoint_stride(),
                place_waypoints: default_place_waypoints(),
                places_radius_m: default_places_radius(),
                max_places: default_max_places(),
                elevation_samples: default_elevation_samples(),
                calories_per_km: default_calories_per_km(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
                otlp_endpoint: None,
            },
        }
    }
}

/// Flat view of the recognized environment variables
///
/// Field names are the lowercased variable names.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    #[serde(default = "default_port")]
    port: u16,
    public_url: Option<String>,
    static_dir: Option<String>,
    tls_cert_path: Option<String>,
    tls_key_path: Option<String>,
    #[serde(default = "default_request_timeout")]
    request_timeout_seconds: u64,
    auth0_domain: Option<String>,
    auth0_client_id: Option<String>,
    auth0_client_secret: Option<String>,
    app_secret_key: Option<String>,
    #[serde(default = "default_http_timeout")]
    http_timeout_seconds: u64,
    #[serde(default = "default_http_max_retries")]
    http_max_retries: u32,
    #[serde(default = "default_pipeline_timeout")]
    pipeline_timeout_seconds: u64,
    google_api_key: Option<String>,
    google_maps_base_url: Option<String>,
    openai_api_key: Option<String>,
    openai_base_url: Option<String>,
    openai_model: Option<String>,
    #[serde(default = "default_max_prompt_tokens")]
    max_prompt_tokens: usize,
    openweathermap_api_key: Option<String>,
    openweathermap_base_url: Option<String>,
    bing_maps_api_key: Option<String>,
    bing_maps_base_url: Option<String>,
    sydney_api_key: Option<String>,
    roadworks_url: Option<String>,
    #[serde(default = "default_place_waypoints")]
    place_waypoints: usize,
    log_level: Option<String>,
    log_format: Option<String>,
    otel_exporter_otlp_endpoint: Option<String>,
}

/// Whitespace-only values count as unset
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<EnvSettings> for AppConfig {
    fn from(env: EnvSettings) -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                port: env.port,
                public_url: present(env.public_url)
                    .unwrap_or_else(|| format!("http://localhost:{}", env.port)),
                static_dir: present(env.static_dir).unwrap_or(defaults.server.static_dir),
                tls_cert_path: present(env.tls_cert_path).map(PathBuf::from),
                tls_key_path: present(env.tls_key_path).map(PathBuf::from),
                request_timeout_seconds: env.request_timeout_seconds,
            },
            identity: IdentityConfig {
                domain: present(env.auth0_domain),
                client_id: present(env.auth0_client_id),
                client_secret: present(env.auth0_client_secret),
            },
            session: SessionConfig {
                secret_key: present(env.app_secret_key),
            },
            http: HttpConfig {
                timeout_seconds: env.http_timeout_seconds,
                max_retries: env.http_max_retries,
                pipeline_timeout_seconds: env.pipeline_timeout_seconds,
            },
            google: GoogleConfig {
                api_key: present(env.google_api_key),
                base_url: present(env.google_maps_base_url).unwrap_or(defaults.google.base_url),
            },
            openai: OpenAiConfig {
                api_key: present(env.openai_api_key),
                base_url: present(env.openai_base_url).unwrap_or(defaults.openai.base_url),
                model: present(env.openai_model).unwrap_or(defaults.openai.model),
                max_prompt_tokens: env.max_prompt_tokens,
            },
            weather: WeatherConfig {
                api_key: present(env.openweathermap_api_key),
                base_url: present(env.openweathermap_base_url)
                    .unwrap_or(defaults.weather.base_url),
            },
            traffic: TrafficConfig {
                api_key: present(env.bing_maps_api_key),
                base_url: present(env.bing_maps_base_url).unwrap_or(defaults.traffic.base_url),
            },
            roadworks: RoadworksConfig {
                api_key: present(env.sydney_api_key),
                url: present(env.roadworks_url).unwrap_or(defaults.roadworks.url),
            },
            aggregation: AggregationConfig {
                place_waypoints: env.place_waypoints,
                ..defaults.aggregation
            },
            logging: LoggingConfig {
                level: present(env.log_level)
                    .map(|level| level.to_lowercase())
                    .unwrap_or(defaults.logging.level),
                format: present(env.log_format)
                    .map(|format| format.to_lowercase())
                    .unwrap_or(defaults.logging.format),
                otlp_endpoint: present(env.otel_exporter_otlp_endpoint),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("Failed to read .env file"),
        }
        Self::from_env(None)
    }

    /// Build configuration from `vars`, or from the process environment when `None`
    pub fn from_env(vars: Option<Map<String, String>>) -> Result<Self> {
        // No try_parsing: a key like `0123` must keep its leading zero,
        // numeric fields still parse from the string on deserialize
        let settings = Config::builder()
            .add_source(Environment::default().ignore_empty(true).source(vars))
            .build()
            .context("Failed to read configuration from the environment")?;

        let env: EnvSettings = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        let mut config = Self::from(env);
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to zeroed or empty fields
    pub fn apply_defaults(&mut self) {
        if self.server.static_dir.is_empty() {
            self.server.static_dir = default_static_dir();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_http_timeout();
        }
        if self.http.pipeline_timeout_seconds == 0 {
            self.http.pipeline_timeout_seconds = default_pipeline_timeout();
        }
        if self.openai.max_prompt_tokens == 0 {
            self.openai.max_prompt_tokens = default_max_prompt_tokens();
        }
        if self.aggregation.waypoint_stride == 0 {
            self.aggregation.waypoint_stride = default_waypoint_stride();
        }
        if self.aggregation.place_waypoints == 0 {
            self.aggregation.place_waypoints = default_place_waypoints();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Names of the upstream credentials that are not configured
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("AUTH0_DOMAIN", self.identity.domain.is_none()),
            ("AUTH0_CLIENT_ID", self.identity.client_id.is_none()),
            ("AUTH0_CLIENT_SECRET", self.identity.client_secret.is_none()),
            ("APP_SECRET_KEY", self.session.secret_key.is_none()),
            ("GOOGLE_API_KEY", self.google.api_key.is_none()),
            ("OPENAI_API_KEY", self.openai.api_key.is_none()),
            ("OPENWEATHERMAP_API_KEY", self.weather.api_key.is_none()),
            ("BING_MAPS_API_KEY", self.traffic.api_key.is_none()),
            ("SYDNEY_API_KEY", self.roadworks.api_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(RouteError::config("HTTP timeout cannot exceed 300 seconds").into());
        }

        if self.http.max_retries > 10 {
            return Err(RouteError::config("HTTP max retries cannot exceed 10").into());
        }

        if self.http.pipeline_timeout_seconds > 600 {
            return Err(RouteError::config("Pipeline timeout cannot exceed 600 seconds").into());
        }

        if self.server.request_timeout_seconds <= self.http.pipeline_timeout_seconds {
            return Err(RouteError::config(format!(
                "REQUEST_TIMEOUT_SECONDS ({}) must be greater than PIPELINE_TIMEOUT_SECONDS ({})",
                self.server.request_timeout_seconds, self.http.pipeline_timeout_seconds
            ))
            .into());
        }

        if self.openai.max_prompt_tokens > 200_000 {
            return Err(RouteError::config("Prompt token budget cannot exceed 200000").into());
        }

        if self.aggregation.place_waypoints > 25 {
            return Err(RouteError::config("Place waypoints cannot exceed 25").into());
        }

        if self.aggregation.elevation_samples > 512 {
            return Err(RouteError::config("Elevation samples cannot exceed 512").into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(RouteError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(RouteError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("PUBLIC_URL", &self.server.public_url),
            ("GOOGLE_MAPS_BASE_URL", &self.google.base_url),
            ("OPENAI_BASE_URL", &self.openai.base_url),
            ("OPENWEATHERMAP_BASE_URL", &self.weather.base_url),
            ("BING_MAPS_BASE_URL", &self.traffic.base_url),
            ("ROADWORKS_URL", &self.roadworks.url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RouteError::config(format!(
                    "{name} must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        if self.server.tls_cert_path.is_some() != self.server.tls_key_path.is_some() {
            return Err(RouteError::config(
                "TLS_CERT_PATH and TLS_KEY_PATH must be set together",
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.openai.model, "gpt-3.5-turbo-16k");
        assert_eq!(config.openai.max_prompt_tokens, 15_000);
        assert_eq!(config.aggregation.waypoint_stride, 20);
        assert_eq!(config.aggregation.max_places, 20);
        assert_eq!(config.aggregation.elevation_samples, 100);
        assert_eq!(config.logging.level, "info");
        assert!(config.google.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = AppConfig::from_env(env(&[])).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.server.public_url, "http://localhost:3000");
        assert_eq!(config.http.max_retries, defaults.http.max_retries);
        assert_eq!(config.google.base_url, defaults.google.base_url);
        assert_eq!(config.roadworks.url, defaults.roadworks.url);
        assert_eq!(config.aggregation.place_waypoints, 5);
    }

    #[test]
    fn test_from_env_reads_recognized_options() {
        let config = AppConfig::from_env(env(&[
            ("PORT", "8080"),
            ("AUTH0_DOMAIN", "tenant.eu.auth0.com"),
            ("GOOGLE_API_KEY", "g-key"),
            ("SYDNEY_API_KEY", "nsw-token"),
            ("HTTP_MAX_RETRIES", "5"),
            ("PLACE_WAYPOINTS", "1"),
            ("LOG_LEVEL", "DEBUG"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.public_url, "http://localhost:8080");
        assert_eq!(config.identity.domain.as_deref(), Some("tenant.eu.auth0.com"));
        assert_eq!(config.google.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.roadworks.api_key.as_deref(), Some("nsw-token"));
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.aggregation.place_waypoints, 1);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_numeric_looking_secrets_stay_verbatim() {
        let config = AppConfig::from_env(env(&[
            ("AUTH0_CLIENT_ID", "0123456"),
            ("APP_SECRET_KEY", "true"),
        ]))
        .unwrap();
        assert_eq!(config.identity.client_id.as_deref(), Some("0123456"));
        assert_eq!(config.session.secret_key.as_deref(), Some("true"));
    }

    #[test]
    fn test_blank_values_are_treated_as_missing() {
        let config = AppConfig::from_env(env(&[
            ("OPENAI_API_KEY", "  "),
            ("GOOGLE_API_KEY", ""),
        ]))
        .unwrap();
        assert!(config.openai.api_key.is_none());
        assert!(config.google.api_key.is_none());
        assert!(config.missing_credentials().contains(&"OPENAI_API_KEY"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::from_env(env(&[("PORT", "eighty")]));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to deserialize configuration")
        );
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = AppConfig::default();
        config.http.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_rejects_non_http_urls() {
        let mut config = AppConfig::default();
        config.google.base_url = "ftp://maps.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout_must_outlast_pipeline() {
        let result = AppConfig::from_env(env(&[
            ("REQUEST_TIMEOUT_SECONDS", "60"),
            ("PIPELINE_TIMEOUT_SECONDS", "120"),
        ]));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("must be greater than PIPELINE_TIMEOUT_SECONDS")
        );

        let mut config = AppConfig::default();
        config.http.pipeline_timeout_seconds = config.server.request_timeout_seconds;
        assert!(config.validate().is_err());

        config.http.pipeline_timeout_seconds = config.server.request_timeout_seconds - 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tls_paths_must_be_paired() {
        let result = AppConfig::from_env(env(&[("TLS_CERT_PATH", "/tmp/cert.pem")]));
        assert!(result.is_err());
    }
}
