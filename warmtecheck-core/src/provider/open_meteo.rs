use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::{
    config::WeatherConfig,
    error::{Error, Result},
    model::HourlyReading,
};

use super::WeatherSource;

const HOURLY_VARIABLE: &str = "temperature_2m";

/// Live source backed by the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoSource {
    base_url: Url,
    http: Client,
}

impl OpenMeteoSource {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            Error::Configuration(format!(
                "invalid weather API base URL '{}': {e}",
                config.api_base_url
            ))
        })?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    hourly: OmHourly,
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    async fn fetch_hourly_forecast(&self, lat: f64, lon: f64) -> Result<Vec<HourlyReading>> {
        let res = self
            .http
            .get(self.base_url.clone())
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("hourly", HOURLY_VARIABLE.to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "failed" };
                Error::UpstreamUnavailable(format!(
                    "Open-Meteo request for ({lat}, {lon}) {kind}: {e}"
                ))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            Error::UpstreamUnavailable(format!("Failed to read Open-Meteo response body: {e}"))
        })?;

        if !status.is_success() {
            let msg = format!(
                "Open-Meteo request failed with status {}: {}",
                status,
                truncate_body(&body)
            );
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Error::UpstreamUnavailable(msg)
            } else {
                Error::UpstreamProtocol(msg)
            });
        }

        let parsed: OmForecastResponse = serde_json::from_str(&body).map_err(|e| {
            Error::UpstreamProtocol(format!("Failed to parse Open-Meteo forecast JSON: {e}"))
        })?;

        zip_hourly(parsed.hourly)
    }
}

fn zip_hourly(hourly: OmHourly) -> Result<Vec<HourlyReading>> {
    if hourly.time.len() != hourly.temperature_2m.len() {
        return Err(Error::UpstreamProtocol(format!(
            "Open-Meteo returned {} timestamps but {} temperatures",
            hourly.time.len(),
            hourly.temperature_2m.len()
        )));
    }

    Ok(hourly
        .time
        .into_iter()
        .zip(hourly.temperature_2m)
        .map(|(time, temp)| HourlyReading { time, temp })
        .collect())
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
