//! MCP tool bindings for [`WeatherService`].

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde::Deserialize;
use weather_core::{
    Coordinates, LocationToken, RegionCode, WeatherError, WeatherService, cancellable,
    error::report,
};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WeatherParams {
    #[schemars(
        description = "Upstream location identifier, for example '47.7623,-122.2054'."
    )]
    pub location: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AlertsParams {
    #[schemars(description = "Two-letter U.S. state code, for example 'WA' or 'CA'.")]
    pub state: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ForecastParams {
    #[schemars(description = "Latitude in decimal degrees, for example 47.7623.")]
    pub latitude: f64,
    #[schemars(description = "Longitude in decimal degrees, for example -122.2054.")]
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct WeatherServer {
    service: WeatherService,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WeatherServer {
    pub fn new(service: WeatherService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "get_weather",
        description = "Retrieves raw weather forecast data from the National Weather Service API \
                       for an upstream location identifier, such as '47.7623,-122.2054'."
    )]
    async fn get_weather(
        &self,
        Parameters(WeatherParams { location }): Parameters<WeatherParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let location: LocationToken = location.parse().map_err(to_mcp_error)?;

        let payload = cancellable(&context.ct, self.service.get_weather(&location))
            .await
            .map_err(to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::json(payload)?]))
    }

    #[tool(
        name = "get_alerts",
        description = "Retrieves all currently active weather alerts, warnings, and advisories \
                       issued by the National Weather Service for the specified state."
    )]
    async fn get_alerts(
        &self,
        Parameters(AlertsParams { state }): Parameters<AlertsParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let region: RegionCode = state.parse().map_err(to_mcp_error)?;

        let text = cancellable(&context.ct, self.service.get_alerts(&region))
            .await
            .map_err(to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "get_forecast",
        description = "Retrieves a multi-period weather forecast from the National Weather Service \
                       for the specified coordinates: temperature, wind and a detailed description \
                       for the next forecast periods (typically the next 2-3 days)."
    )]
    async fn get_forecast(
        &self,
        Parameters(params): Parameters<ForecastParams>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let coordinates = params.coordinates().map_err(to_mcp_error)?;

        let text = cancellable(&context.ct, self.service.get_forecast(coordinates))
            .await
            .map_err(to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Weather forecasts and active alerts from the National Weather Service.".into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

impl ForecastParams {
    fn coordinates(&self) -> Result<Coordinates, WeatherError> {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Bad arguments become `invalid_params`; everything else is an internal error
/// carrying the full cause chain.
fn to_mcp_error(err: WeatherError) -> McpError {
    let message = report(&err);
    if err.is_invalid_input() {
        McpError::invalid_params(message, None)
    } else {
        McpError::internal_error(message, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use rmcp::{
        RoleClient, ServiceError, ServiceExt,
        model::{CallToolRequest, CallToolRequestParam, ClientRequest, ErrorCode, JsonObject},
        service::{PeerRequestOptions, RunningService},
    };
    use serde_json::{Value, json};
    use tokio::sync::oneshot;
    use weather_core::{Config, Fetch, HttpError, StatusCode, Url};

    fn server() -> WeatherServer {
        WeatherServer::new(WeatherService::from_config(&Config::default()).unwrap())
    }

    /// Answers every request with the same payload and records the URLs.
    #[derive(Debug)]
    struct CannedFetch {
        payload: Value,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetch for CannedFetch {
        async fn fetch(&self, url: &str) -> Result<Value, HttpError> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(self.payload.clone())
        }
    }

    /// Never answers; reports when a request starts and when it is dropped.
    #[derive(Debug)]
    struct StalledFetch {
        started: Mutex<Option<oneshot::Sender<()>>>,
        dropped: Mutex<Option<oneshot::Sender<()>>>,
    }

    struct SignalOnDrop(Option<oneshot::Sender<()>>);

    impl Drop for SignalOnDrop {
        fn drop(&mut self) {
            if let Some(tx) = self.0.take() {
                let _ = tx.send(());
            }
        }
    }

    #[async_trait]
    impl Fetch for StalledFetch {
        async fn fetch(&self, _url: &str) -> Result<Value, HttpError> {
            let _guard = SignalOnDrop(self.dropped.lock().unwrap().take());
            if let Some(tx) = self.started.lock().unwrap().take() {
                let _ = tx.send(());
            }
            std::future::pending().await
        }
    }

    fn service(fetch: Arc<dyn Fetch>) -> WeatherService {
        WeatherService::new(fetch, Url::parse("https://api.weather.gov").unwrap())
    }

    async fn connect(service: WeatherService) -> RunningService<RoleClient, ()> {
        let (server_io, client_io) = tokio::io::duplex(8 * 1024);
        tokio::spawn(async move {
            let running = WeatherServer::new(service).serve(server_io).await?;
            running.waiting().await?;
            anyhow::Ok(())
        });
        ().serve(client_io).await.unwrap()
    }

    fn call(name: &'static str, arguments: Value) -> CallToolRequestParam {
        let arguments: JsonObject = serde_json::from_value(arguments).unwrap();
        CallToolRequestParam {
            name: name.into(),
            arguments: Some(arguments),
        }
    }

    #[test]
    fn registers_the_three_tools() {
        let server = server();
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(names, ["get_alerts", "get_forecast", "get_weather"]);
    }

    #[test]
    fn forecast_schema_takes_numeric_coordinates() {
        let tool = server()
            .tool_router
            .list_all()
            .into_iter()
            .find(|tool| tool.name == "get_forecast")
            .unwrap();

        let properties = tool.input_schema.get("properties").unwrap();
        assert_eq!(properties["latitude"]["type"], "number");
        assert_eq!(properties["longitude"]["type"], "number");
    }

    #[test]
    fn invalid_coordinates_are_invalid_params() {
        let params = ForecastParams {
            latitude: 123.0,
            longitude: 0.0,
        };
        let err = to_mcp_error(params.coordinates().unwrap_err());

        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("invalid coordinates"));
    }

    #[test]
    fn bad_state_is_invalid_params() {
        let err = to_mcp_error("Washington".parse::<RegionCode>().unwrap_err());
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn upstream_failures_are_internal_errors_with_cause() {
        let err = to_mcp_error(WeatherError::Upstream(HttpError::UpstreamHttp {
            url: "https://api.weather.gov/alerts/active/area/WA".into(),
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".into(),
        }));

        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("502 Bad Gateway"));
        assert!(err.message.contains("upstream down"));
    }

    #[test]
    fn cancellation_is_reported() {
        let err = to_mcp_error(WeatherError::Cancelled);
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert_eq!(err.message, "request cancelled");
    }

    #[tokio::test]
    async fn get_weather_returns_the_payload_as_json_text() {
        let payload = json!({ "properties": { "periods": [{ "name": "Tonight" }] } });
        let fetch = Arc::new(CannedFetch {
            payload: payload.clone(),
            calls: Mutex::default(),
        });
        let client = connect(service(fetch.clone())).await;

        let result = client
            .call_tool(call("get_weather", json!({ "location": "47.7623,-122.2054" })))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(false));
        let text = &result.content[0].as_text().unwrap().text;
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), payload);
        assert_eq!(
            *fetch.calls.lock().unwrap(),
            ["https://api.weather.gov/points/47.7623,-122.2054/forecast"]
        );

        client.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn get_alerts_over_the_wire_rejects_a_bad_state() {
        let fetch = Arc::new(CannedFetch {
            payload: json!({}),
            calls: Mutex::default(),
        });
        let client = connect(service(fetch.clone())).await;

        let err = client
            .call_tool(call("get_alerts", json!({ "state": "Washington" })))
            .await
            .unwrap_err();

        match err {
            ServiceError::McpError(data) => assert_eq!(data.code, ErrorCode::INVALID_PARAMS),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(fetch.calls.lock().unwrap().is_empty());

        client.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn client_cancellation_drops_the_upstream_request() {
        let (started_tx, started_rx) = oneshot::channel();
        let (dropped_tx, dropped_rx) = oneshot::channel();
        let fetch = Arc::new(StalledFetch {
            started: Mutex::new(Some(started_tx)),
            dropped: Mutex::new(Some(dropped_tx)),
        });
        let client = connect(service(fetch)).await;

        let request = ClientRequest::CallToolRequest(CallToolRequest::new(call(
            "get_forecast",
            json!({ "latitude": 47.7623, "longitude": -122.2054 }),
        )));
        let handle = client
            .send_cancellable_request(request, PeerRequestOptions::no_options())
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), started_rx)
            .await
            .expect("upstream request never started")
            .unwrap();
        handle.cancel(Some("user aborted".into())).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), dropped_rx)
            .await
            .expect("upstream request was not dropped")
            .unwrap();

        client.cancel().await.unwrap();
    }
}
