//! `ridewise` - cycling route reports
//!
//! Combines directions, points of interest, elevation, weather, traffic and
//! roadworks data for a route and asks a language model for a
//! health-focused summary, served over a small web application.

pub mod api;
pub mod auth;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod geospatial;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod summary;
pub mod telemetry;
pub mod views;
pub mod web;

// Re-export core types for public API
pub use crate::config::AppConfig;
pub use error::{ErrorKind, RouteError};
pub use models::{Coordinates, Place, RouteReport};
pub use pipeline::RoutePipeline;
pub use session::{MemorySessionStore, SessionStore};
pub use web::AppState;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RouteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
