//! Scripted [`Fetch`] and upstream fixtures shared by the unit tests.

use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::{client::Fetch, error::HttpError};

/// Replays queued responses in order and records every requested URL.
#[derive(Debug, Default)]
pub(crate) struct ScriptedFetch {
    responses: Mutex<VecDeque<Result<Value, HttpError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetch {
    pub(crate) fn new(responses: impl IntoIterator<Item = Result<Value, HttpError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for ScriptedFetch {
    async fn fetch(&self, url: &str) -> Result<Value, HttpError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {url}"))
    }
}

/// A [`Fetch`] whose requests never complete.
#[derive(Debug, Default)]
pub(crate) struct PendingFetch;

#[async_trait]
impl Fetch for PendingFetch {
    async fn fetch(&self, _url: &str) -> Result<Value, HttpError> {
        std::future::pending().await
    }
}

pub(crate) fn status_error(url: &str, status: u16) -> HttpError {
    HttpError::UpstreamHttp {
        url: url.to_string(),
        status: StatusCode::from_u16(status).unwrap(),
        body: r#"{"title":"upstream error"}"#.to_string(),
    }
}

pub(crate) fn sample_points() -> Value {
    json!({
        "properties": {
            "forecast": "https://api.weather.gov/gridpoints/SEW/124,67/forecast"
        }
    })
}

pub(crate) fn sample_forecast() -> Value {
    json!({
        "properties": {
            "periods": [
                {
                    "name": "Tonight",
                    "temperature": 45,
                    "temperatureUnit": "F",
                    "windSpeed": "5 mph",
                    "windDirection": "NW",
                    "detailedForecast": "Partly cloudy with a low around 45."
                },
                {
                    "name": "Saturday",
                    "temperature": 62,
                    "temperatureUnit": "F",
                    "windSpeed": "10 mph",
                    "windDirection": "W",
                    "detailedForecast": "Sunny with a high near 62."
                }
            ]
        }
    })
}

pub(crate) fn sample_alerts() -> Value {
    json!({
        "features": [
            {
                "properties": {
                    "event": "Winter Storm Warning",
                    "areaDesc": "Seattle Metro Area",
                    "severity": "Severe",
                    "description": "Heavy snow expected.",
                    "instruction": "Stay indoors if possible."
                }
            },
            {
                "properties": {
                    "event": "Wind Advisory",
                    "areaDesc": "Puget Sound",
                    "severity": "Moderate",
                    "description": "Strong winds expected.",
                    "instruction": "Secure loose objects."
                }
            }
        ]
    })
}
