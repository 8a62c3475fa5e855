use reqwest::StatusCode;
use thiserror::Error;

use crate::model::Coordinates;

/// Failure of a single upstream GET issued by [`crate::client::Fetch`].
#[derive(Debug, Error)]
pub enum HttpError {
    /// The upstream answered with a non-2xx status.
    #[error("upstream request to {url} failed with status {status}: {body}")]
    UpstreamHttp {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// The request never produced a response (connect failure, timeout, bad URL).
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response whose body is not JSON.
    #[error("response from {url} is not valid JSON")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HttpError {
    /// Status code of a non-2xx response, if that is what this error is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why the `points` stage of the forecast resolver failed.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("points lookup failed")]
    Lookup(#[source] HttpError),

    #[error("points response has no `properties.forecast` URL")]
    MissingForecastUrl,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    /// A single-stage upstream call failed.
    #[error(transparent)]
    Upstream(#[from] HttpError),

    #[error("could not resolve the forecast grid for {coordinates}")]
    Resolution {
        coordinates: Coordinates,
        #[source]
        source: ResolutionError,
    },

    #[error("could not fetch the forecast from {url}")]
    Fetch {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("forecast period {index} is malformed: {reason}")]
    MalformedPeriod { index: usize, reason: String },

    #[error("malformed {resource} payload: {reason}")]
    MalformedPayload {
        resource: &'static str,
        reason: String,
    },

    #[error(
        "invalid coordinates ({latitude}, {longitude}): latitude must be within [-90, 90] \
         and longitude within [-180, 180]"
    )]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("invalid region code '{0}': expected a two-letter code such as 'WA'")]
    InvalidRegion(String),

    #[error("location must not be empty")]
    EmptyLocation,

    #[error("request cancelled")]
    Cancelled,
}

impl WeatherError {
    /// Original HTTP status of the upstream response behind this error, at any stage.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            WeatherError::Upstream(err)
            | WeatherError::Fetch { source: err, .. }
            | WeatherError::Resolution {
                source: ResolutionError::Lookup(err),
                ..
            } => err.status(),
            _ => None,
        }
    }

    /// True when the caller supplied bad arguments, as opposed to an upstream failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            WeatherError::InvalidCoordinates { .. }
                | WeatherError::InvalidRegion(_)
                | WeatherError::EmptyLocation
        )
    }
}

/// Render an error and all of its sources on one line, outermost first.
pub fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
