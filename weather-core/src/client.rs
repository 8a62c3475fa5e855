use std::fmt::Debug;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client, ClientBuilder, Url,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde_json::Value;
use tracing::{debug, error};

use crate::{config::Config, error::HttpError};

/// Media type requested from the upstream on every call.
pub const GEO_JSON: &str = "application/geo+json";

/// Issues one GET and returns the parsed JSON body of a 2xx response.
#[async_trait]
pub trait Fetch: Send + Sync + Debug {
    async fn fetch(&self, url: &str) -> Result<Value, HttpError>;
}

/// `reqwest` backed [`Fetch`] with fixed identification headers, a bounded
/// timeout and an optional `apikey` query parameter.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Self::builder(config)?
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(http, config.api_key.clone()))
    }

    /// Client builder preloaded with the headers and timeout from `config`.
    pub fn builder(config: &Config) -> Result<ClientBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .with_context(|| format!("Invalid user agent: {:?}", config.user_agent))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(GEO_JSON));

        Ok(Client::builder()
            .default_headers(headers)
            .timeout(config.timeout()))
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn fetch(&self, url: &str) -> Result<Value, HttpError> {
        let mut request = self.http.get(url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        debug!(url, "GET");

        let res = request.send().await.map_err(|source| {
            error!(url, error = %source, "upstream request failed to complete");
            HttpError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| {
            error!(url, %status, error = %source, "failed to read upstream response body");
            HttpError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        if !status.is_success() {
            let body = truncate_body(&body);
            error!(url, %status, body = %body, "upstream returned an error status");
            return Err(HttpError::UpstreamHttp {
                url: url.to_string(),
                status,
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| {
            error!(url, error = %source, "upstream response is not valid JSON");
            HttpError::Decode {
                url: url.to_string(),
                source,
            }
        })
    }
}

/// Append path segments to `base`, percent-encoding each one so that
/// caller-supplied values cannot introduce extra segments or a query.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> String {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.into()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
