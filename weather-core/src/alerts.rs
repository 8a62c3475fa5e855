use std::fmt;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    client::{Fetch, endpoint},
    error::WeatherError,
    model::{AlertCollection, AlertFeature, RegionCode},
};

/// Returned in place of a report when the payload carries no `features` list.
pub const NO_ALERTS: &str = "Cannot get alerts or no alerts found.";

/// Separator between independent alert blocks.
pub const ALERT_SEPARATOR: &str = "\n---\n";

const UNKNOWN: &str = "Unknown";
const NO_DESCRIPTION: &str = "No description available";
const NO_INSTRUCTIONS: &str = "No specific instructions provided";

/// Outcome of an alerts lookup. An empty result is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertReport {
    Alerts(Vec<String>),
    NoneFound,
}

impl AlertReport {
    /// Build a report from an alerts-by-area payload.
    pub fn from_payload(payload: Value) -> Result<Self, WeatherError> {
        let collection = AlertCollection::deserialize(payload).map_err(|err| {
            error!(error = %err, "malformed alerts payload");
            WeatherError::MalformedPayload {
                resource: "alerts",
                reason: err.to_string(),
            }
        })?;

        Ok(match collection.features {
            Some(features) => AlertReport::Alerts(features.iter().map(format_alert).collect()),
            None => AlertReport::NoneFound,
        })
    }

    pub fn blocks(&self) -> &[String] {
        match self {
            AlertReport::Alerts(blocks) => blocks,
            AlertReport::NoneFound => &[],
        }
    }
}

impl fmt::Display for AlertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReport::Alerts(blocks) => f.write_str(&blocks.join(ALERT_SEPARATOR)),
            AlertReport::NoneFound => f.write_str(NO_ALERTS),
        }
    }
}

/// Render one alert; absent fields get their named default, never an error.
pub fn format_alert(feature: &AlertFeature) -> String {
    let props = &feature.properties;
    format!(
        "Event: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}",
        props.event.as_deref().unwrap_or(UNKNOWN),
        props.area_desc.as_deref().unwrap_or(UNKNOWN),
        props.severity.as_deref().unwrap_or(UNKNOWN),
        props.description.as_deref().unwrap_or(NO_DESCRIPTION),
        props.instruction.as_deref().unwrap_or(NO_INSTRUCTIONS),
    )
}

/// Fetch and render all active alerts for `region`.
pub async fn fetch_alerts(
    fetch: &dyn Fetch,
    base: &Url,
    region: &RegionCode,
) -> Result<AlertReport, WeatherError> {
    let url = endpoint(base, &["alerts", "active", "area", region.as_str()]);
    let payload = fetch.fetch(&url).await?;

    let report = AlertReport::from_payload(payload)?;
    debug!(%region, alerts = report.blocks().len(), "fetched active alerts");
    Ok(report)
}
