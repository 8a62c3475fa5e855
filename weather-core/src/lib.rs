//! Core library for the `weather-mcp` server.
//!
//! This crate defines:
//! - Configuration (config file + environment)
//! - The upstream HTTP client adapter
//! - Forecast resolution and alert lookup, with their text renderings
//! - Shared domain models and the error taxonomy
//!
//! It is used by `weather-mcp`, but can also be reused by other binaries or services.

pub mod alerts;
pub mod client;
pub mod config;
pub mod error;
pub mod forecast;
pub mod model;
pub mod service;

#[cfg(test)]
mod testing;

pub use alerts::AlertReport;
pub use client::{Fetch, HttpClient};
pub use config::Config;
pub use error::{HttpError, ResolutionError, WeatherError};
pub use model::{Coordinates, ForecastPeriod, LocationQuery, LocationToken, RegionCode};
pub use service::{WeatherService, cancellable};
pub use reqwest::{StatusCode, Url};
