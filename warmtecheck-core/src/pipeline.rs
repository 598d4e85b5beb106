use chrono::Utc;
use futures::future::try_join_all;

use crate::{
    error::Result,
    model::{ForecastEntry, Location, LocationReport, RunReport},
    provider::WeatherSource,
    storage::StorageSink,
};

/// Fetch → compute → aggregate → persist.
///
/// Per-location fetches run concurrently; results keep the input order and
/// the first failure aborts the whole run before anything is persisted.
#[derive(Debug, Clone, Copy)]
pub struct ForecastPipeline<'a> {
    source: &'a dyn WeatherSource,
    sink: &'a dyn StorageSink,
}

impl<'a> ForecastPipeline<'a> {
    pub fn new(source: &'a dyn WeatherSource, sink: &'a dyn StorageSink) -> Self {
        Self { source, sink }
    }

    /// Build the report without persisting it.
    pub async fn run(&self, locations: &[Location]) -> Result<RunReport> {
        let generated_at = Utc::now();
        tracing::info!(locations = locations.len(), %generated_at, "forecast run started");

        let results = try_join_all(locations.iter().map(|loc| self.report_for(loc))).await?;

        Ok(RunReport { generated_at, results })
    }

    /// Run, then hand the report to the sink exactly once.
    pub async fn run_and_upload(&self, locations: &[Location]) -> Result<RunReport> {
        let report = self.run(locations).await?;
        self.sink.upload(&report).await?;
        tracing::info!(places = report.results.len(), "forecast run finished");
        Ok(report)
    }

    async fn report_for(&self, location: &Location) -> Result<LocationReport> {
        let readings = self.source.fetch_hourly_forecast(location.lat, location.lon).await?;
        tracing::debug!(place = %location.name, hours = readings.len(), "forecast fetched");

        Ok(LocationReport {
            place: location.name.clone(),
            forecast: readings.into_iter().map(ForecastEntry::from).collect(),
        })
    }
}
