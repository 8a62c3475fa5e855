//! Forecast lookup and rendering.
//!
//! Coordinates resolve in two sequential stages: the `points` resource names
//! the location's grid forecast URL, which is then fetched verbatim. A raw
//! location token skips the first stage and hits `points/{token}/forecast`.

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    client::{Fetch, endpoint},
    error::{ResolutionError, WeatherError},
    model::{Coordinates, ForecastPeriod, LocationToken},
};

/// Number of periods rendered unless configured otherwise.
pub const DEFAULT_PERIOD_LIMIT: usize = 5;

/// Separator between rendered forecast periods.
pub const PERIOD_SEPARATOR: &str = "\n\n";

/// Stage 1: look up the grid forecast URL for `coordinates`.
pub async fn resolve_grid(
    fetch: &dyn Fetch,
    base: &Url,
    coordinates: Coordinates,
) -> Result<String, WeatherError> {
    let points_url = endpoint(base, &["points", &coordinates.to_string()]);

    let points = fetch
        .fetch(&points_url)
        .await
        .map_err(|err| WeatherError::Resolution {
            coordinates,
            source: ResolutionError::Lookup(err),
        })?;

    let Some(forecast_url) = points.pointer("/properties/forecast").and_then(Value::as_str) else {
        error!(%coordinates, url = %points_url, "points response has no forecast URL");
        return Err(WeatherError::Resolution {
            coordinates,
            source: ResolutionError::MissingForecastUrl,
        });
    };

    debug!(%coordinates, forecast_url, "resolved forecast grid");
    Ok(forecast_url.to_string())
}

/// Both stages: resolve the grid endpoint, then fetch its forecast payload.
pub async fn fetch_forecast(
    fetch: &dyn Fetch,
    base: &Url,
    coordinates: Coordinates,
) -> Result<Value, WeatherError> {
    let forecast_url = resolve_grid(fetch, base, coordinates).await?;

    fetch
        .fetch(&forecast_url)
        .await
        .map_err(|source| WeatherError::Fetch {
            url: forecast_url,
            source,
        })
}

/// Single-stage forecast for an opaque upstream location token.
pub async fn fetch_location_forecast(
    fetch: &dyn Fetch,
    base: &Url,
    location: &LocationToken,
) -> Result<Value, WeatherError> {
    let url = endpoint(base, &["points", location.as_str(), "forecast"]);
    Ok(fetch.fetch(&url).await?)
}

/// Parse the first `limit` entries of `properties.periods`, in upstream order.
pub fn parse_periods(payload: &Value, limit: usize) -> Result<Vec<ForecastPeriod>, WeatherError> {
    let Some(periods) = payload.pointer("/properties/periods").and_then(Value::as_array) else {
        error!("forecast payload has no `properties.periods` array");
        return Err(WeatherError::MalformedPayload {
            resource: "forecast",
            reason: "missing `properties.periods` array".to_string(),
        });
    };

    periods
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, raw)| {
            ForecastPeriod::deserialize(raw).map_err(|err| {
                error!(index, error = %err, "malformed forecast period");
                WeatherError::MalformedPeriod {
                    index,
                    reason: err.to_string(),
                }
            })
        })
        .collect()
}

pub fn format_period(period: &ForecastPeriod) -> String {
    format!(
        "{}:\nTemperature: {}°{}\nWind: {} {}\nForecast: {}",
        period.name,
        period.temperature,
        period.temperature_unit,
        period.wind_speed,
        period.wind_direction,
        period.detailed_forecast,
    )
}

/// Render at most `limit` periods as text blocks.
pub fn render_periods(periods: &[ForecastPeriod], limit: usize) -> Vec<String> {
    periods.iter().take(limit).map(format_period).collect()
}

/// Render a whole forecast payload into the report returned to callers.
pub fn render_forecast(payload: &Value, limit: usize) -> Result<String, WeatherError> {
    let periods = parse_periods(payload, limit)?;
    Ok(render_periods(&periods, limit).join(PERIOD_SEPARATOR))
}
