//! Payloads returned by the route report endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final `/route_info` payload
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteReport {
    pub start: String,
    pub end: String,
    /// Mean elevation along the start/end line, truncated to whole meters
    pub elevation: i64,
    pub weather: Value,
    pub traffic: Value,
    pub roadworks: Value,
    pub calories_burned: u64,
    /// Summary text with newlines turned into `<br>`
    pub response: String,
}

/// Flat error payload; carries no cause classification
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub error: String,
}

impl ErrorPayload {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            error: message.into(),
        }
    }
}
