//! Error types and handling for the route report service

use thiserror::Error;

/// Message returned to callers when the directions service finds no route
pub const NO_ROUTE_MESSAGE: &str = "No routes found from Google Directions API";

/// Coarse failure categories exposed to logs and callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An external call failed, returned a non-success status or malformed JSON
    UpstreamApiFailure,
    /// The directions service returned an empty route set
    NoRouteFound,
    /// Anything else
    GenericServerError,
}

/// Main error type for the route report pipeline
#[derive(Error, Debug)]
pub enum RouteError {
    /// Directions service returned zero routes
    #[error("{}", NO_ROUTE_MESSAGE)]
    NoRouteFound,

    /// Upstream API communication errors
    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// The pipeline did not finish before its deadline
    #[error("Route report timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl RouteError {
    /// Create a new upstream API error
    pub fn upstream<S: Into<String>>(service: &'static str, message: S) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteError::NoRouteFound => ErrorKind::NoRouteFound,
            RouteError::Upstream { .. } | RouteError::Timeout { .. } => {
                ErrorKind::UpstreamApiFailure
            }
            RouteError::Validation { .. }
            | RouteError::Config { .. }
            | RouteError::General { .. } => ErrorKind::GenericServerError,
        }
    }
}
