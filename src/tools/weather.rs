//! Weather tool - current conditions from weatherapi.com

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Number, Value};
use crate::config::require_key;
use crate::gateway::error_for_status;
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

pub const WEATHER_API_BASE: &str = "https://api.weatherapi.com/v1";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: Location,
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Current {
    // Kept as JSON numbers so the report shows them as the provider sent them
    temp_c: Number,
    temp_f: Number,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

pub struct WeatherTool {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherTool {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: WEATHER_API_BASE.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str { "get_weather" }
    fn description(&self) -> &str { "Get the current weather report for a city" }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("city", ParamKind::String, "City name, e.g. \"New York\"")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let api_key = require_key(&self.api_key, "WEATHER_API_KEY")?;
        let city = args.str("city")?;

        let response = self.client
            .get(format!("{}/current.json", self.base_url.trim_end_matches('/')))
            .query(&[("q", city), ("key", api_key)])
            .send()
            .await?;
        let weather: CurrentResponse = error_for_status(response).await?.json().await?;
        tracing::debug!("Weather for {} resolved to {}", city, weather.location.name);

        Ok(json!({
            "report": format!(
                "The weather in {} is {} with a temperature of {} degrees Celsius ({} degrees Fahrenheit).",
                weather.location.name,
                weather.current.condition.text.to_lowercase(),
                weather.current.temp_c,
                weather.current.temp_f,
            )
        }))
    }
}
