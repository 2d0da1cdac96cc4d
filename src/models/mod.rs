//! Data models for the route report service
//!
//! - Location: route endpoints and coordinates
//! - Report: the response payloads of the report endpoint

pub mod location;
pub mod report;

pub use location::{Coordinates, Place};
pub use report::{ErrorPayload, RouteReport};
