use async_trait::async_trait;
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use crate::{error::Result, model::HourlyReading};

use super::WeatherSource;

/// Deterministic source returning the same programmed forecast for every
/// coordinate. Keeps a call counter and the last coordinates for assertions.
#[derive(Debug)]
pub struct FixedForecastSource {
    forecast: Mutex<Vec<HourlyReading>>,
    calls: AtomicUsize,
    last_coordinates: Mutex<Option<(f64, f64)>>,
}

impl FixedForecastSource {
    pub fn new(forecast: Vec<HourlyReading>) -> Self {
        Self {
            forecast: Mutex::new(forecast),
            calls: AtomicUsize::new(0),
            last_coordinates: Mutex::new(None),
        }
    }

    pub fn set_forecast(&self, forecast: Vec<HourlyReading>) {
        *self.forecast.lock().unwrap_or_else(PoisonError::into_inner) = forecast;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_coordinates(&self) -> Option<(f64, f64)> {
        *self.last_coordinates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FixedForecastSource {
    fn default() -> Self {
        Self::new(vec![HourlyReading::new("2023-01-01T12:00", 15.0)])
    }
}

#[async_trait]
impl WeatherSource for FixedForecastSource {
    async fn fetch_hourly_forecast(&self, lat: f64, lon: f64) -> Result<Vec<HourlyReading>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_coordinates.lock().unwrap_or_else(PoisonError::into_inner) = Some((lat, lon));
        Ok(self.forecast.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
