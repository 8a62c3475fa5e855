use std::{future::Future, sync::Arc};

use anyhow::Result;
use reqwest::Url;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::{
    alerts::{self, AlertReport},
    client::{Fetch, HttpClient},
    config::Config,
    error::WeatherError,
    forecast::{self, DEFAULT_PERIOD_LIMIT},
    model::{Coordinates, ForecastPeriod, LocationQuery, LocationToken, RegionCode},
};

/// The three weather operations, bound to one upstream.
///
/// Cheap to clone; every call is independent and shares nothing mutable.
#[derive(Debug, Clone)]
pub struct WeatherService {
    fetch: Arc<dyn Fetch>,
    api_base: Url,
    period_limit: usize,
}

impl WeatherService {
    pub fn new(fetch: Arc<dyn Fetch>, api_base: Url) -> Self {
        Self {
            fetch,
            api_base,
            period_limit: DEFAULT_PERIOD_LIMIT,
        }
    }

    pub fn with_period_limit(mut self, limit: usize) -> Self {
        self.period_limit = limit.max(1);
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = HttpClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), config.api_base_url()?)
            .with_period_limit(config.forecast_periods))
    }

    pub fn period_limit(&self) -> usize {
        self.period_limit
    }

    /// Raw forecast payload for an opaque location token (single upstream call).
    #[instrument(name = "get_weather", skip_all, fields(%location))]
    pub async fn get_weather(&self, location: &LocationToken) -> Result<Value, WeatherError> {
        forecast::fetch_location_forecast(self.fetch.as_ref(), &self.api_base, location).await
    }

    /// Raw forecast payload for either kind of location.
    pub async fn raw_forecast(&self, query: &LocationQuery) -> Result<Value, WeatherError> {
        match query {
            LocationQuery::Token(token) => self.get_weather(token).await,
            LocationQuery::Coordinates(coordinates) => self.grid_forecast(*coordinates).await,
        }
    }

    /// Active alerts for `region`, rendered for the caller.
    pub async fn get_alerts(&self, region: &RegionCode) -> Result<String, WeatherError> {
        Ok(self.alert_report(region).await?.to_string())
    }

    #[instrument(name = "get_alerts", skip_all, fields(%region))]
    pub async fn alert_report(&self, region: &RegionCode) -> Result<AlertReport, WeatherError> {
        let report = alerts::fetch_alerts(self.fetch.as_ref(), &self.api_base, region).await?;
        if report == AlertReport::NoneFound {
            info!("no active alerts");
        }
        Ok(report)
    }

    /// Multi-period forecast for `coordinates`, rendered for the caller.
    pub async fn get_forecast(&self, coordinates: Coordinates) -> Result<String, WeatherError> {
        let periods = self.forecast_periods(coordinates).await?;
        Ok(forecast::render_periods(&periods, self.period_limit).join(forecast::PERIOD_SEPARATOR))
    }

    /// The first forecast periods for `coordinates`, parsed but not rendered.
    #[instrument(name = "get_forecast", skip_all, fields(%coordinates))]
    pub async fn forecast_periods(
        &self,
        coordinates: Coordinates,
    ) -> Result<Vec<ForecastPeriod>, WeatherError> {
        let payload =
            forecast::fetch_forecast(self.fetch.as_ref(), &self.api_base, coordinates).await?;
        forecast::parse_periods(&payload, self.period_limit)
    }

    #[instrument(name = "raw_forecast", skip_all, fields(%coordinates))]
    async fn grid_forecast(&self, coordinates: Coordinates) -> Result<Value, WeatherError> {
        forecast::fetch_forecast(self.fetch.as_ref(), &self.api_base, coordinates).await
    }
}

/// Run `operation` until it finishes or `token` is cancelled. On cancellation
/// the operation, including any in-flight request, is dropped.
pub async fn cancellable<T, F>(token: &CancellationToken, operation: F) -> Result<T, WeatherError>
where
    F: Future<Output = Result<T, WeatherError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            warn!("operation cancelled by caller");
            Err(WeatherError::Cancelled)
        }
        result = operation => result,
    }
}
