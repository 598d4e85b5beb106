use async_trait::async_trait;
use std::fmt::Debug;

use crate::{config::WeatherConfig, error::Result, model::HourlyReading};

pub mod fixed;
pub mod open_meteo;

pub use fixed::FixedForecastSource;
pub use open_meteo::OpenMeteoSource;

/// Anything that can produce an hourly temperature forecast for a coordinate.
///
/// Implementations return readings in the chronological order the upstream
/// provider delivered them and never retry internally.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_hourly_forecast(&self, lat: f64, lon: f64) -> Result<Vec<HourlyReading>>;
}

/// Construct the live weather source from config.
pub fn source_from_config(config: &WeatherConfig) -> Result<Box<dyn WeatherSource>> {
    Ok(Box::new(OpenMeteoSource::new(config)?))
}
