use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{error, info};
use weather_core::{Config, Coordinates, LocationQuery, LocationToken, RegionCode, WeatherService};

use crate::server::WeatherServer;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-mcp",
    version,
    about = "MCP weather server: forecast and alert tools for LLM clients"
)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the weather tools over stdio (the default).
    Serve,

    /// Interactively set the upstream URL, API key and client identifier.
    Configure,

    /// Print the detailed forecast for a pair of coordinates.
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        /// Print the parsed periods as JSON instead of text.
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Print the upstream forecast payload unchanged.
        #[arg(long)]
        raw: bool,
    },

    /// Print active alerts for a two-letter state code.
    Alerts {
        state: String,
    },

    /// Print the raw forecast payload for an upstream location identifier.
    Weather {
        location: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Serve) {
            Command::Serve => serve().await,
            Command::Configure => configure(),
            Command::Forecast {
                latitude,
                longitude,
                json,
                raw,
            } => {
                let service = service()?;
                let coordinates = Coordinates::new(latitude, longitude)?;

                if raw {
                    let payload = service.raw_forecast(&LocationQuery::from(coordinates)).await?;
                    print_json(&payload)
                } else if json {
                    print_json(&service.forecast_periods(coordinates).await?)
                } else {
                    println!("{}", service.get_forecast(coordinates).await?);
                    Ok(())
                }
            }
            Command::Alerts { state } => {
                let region: RegionCode = state.parse()?;
                println!("{}", service()?.get_alerts(&region).await?);
                Ok(())
            }
            Command::Weather { location } => {
                let location: LocationToken = location.parse()?;
                let payload = service()?
                    .raw_forecast(&LocationQuery::from(location))
                    .await?;
                print_json(&payload)
            }
        }
    }
}

fn service() -> Result<WeatherService> {
    let config = Config::load()?;
    WeatherService::from_config(&config)
}

async fn serve() -> Result<()> {
    let server = WeatherServer::new(service()?);

    info!("Starting MCP weather server on stdio");
    let running = server
        .serve(stdio())
        .await
        .inspect_err(|err| error!(error = ?err, "failed to start MCP server"))?;

    let reason = running.waiting().await?;
    info!(?reason, "MCP weather server stopped");
    Ok(())
}

fn configure() -> Result<()> {
    let mut config = Config::load_file()?;

    config.api_base = Text::new("Upstream base URL:")
        .with_default(&config.api_base)
        .prompt()?;

    let key = Text::new("API key (leave empty for none):")
        .with_default(config.api_key.as_deref().unwrap_or_default())
        .prompt()?;
    config.api_key = Some(key.trim().to_string()).filter(|k| !k.is_empty());

    config.user_agent = Text::new("User-Agent sent upstream:")
        .with_default(&config.user_agent)
        .prompt()?;

    config.timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.timeout_secs)
        .with_error_message("Please enter a whole number of seconds")
        .prompt()?;

    config.forecast_periods = CustomType::<usize>::new("Forecast periods to show:")
        .with_default(config.forecast_periods)
        .with_error_message("Please enter a whole number")
        .prompt()?;

    config.validate()?;
    config.save()?;

    println!(
        "Saved configuration to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["weather-mcp", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(cli.command.is_none());
    }

    #[test]
    fn forecast_accepts_negative_longitude() {
        let cli = Cli::try_parse_from([
            "weather-mcp",
            "forecast",
            "--latitude",
            "47.7623",
            "--longitude",
            "-122.2054",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Forecast {
                latitude,
                longitude,
                json,
                raw,
            }) => {
                assert_eq!(latitude, 47.7623);
                assert_eq!(longitude, -122.2054);
                assert!(!json && !raw);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn json_and_raw_conflict() {
        let err = Cli::try_parse_from([
            "weather-mcp",
            "forecast",
            "--latitude",
            "1",
            "--longitude",
            "2",
            "--json",
            "--raw",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn alerts_takes_a_state() {
        let cli = Cli::try_parse_from(["weather-mcp", "alerts", "WA", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Some(Command::Alerts { state }) if state == "WA"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
