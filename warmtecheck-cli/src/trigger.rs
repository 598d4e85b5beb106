use std::time::Duration;

use warmtecheck_core::{
    Config, Error, ForecastPipeline, Location, Result, RunReport, StorageSink,
    model::validate_locations, sink_from_config, source_from_config, storage::RecordingSink,
};

/// Build collaborators from config and run the pipeline once.
///
/// With `dry_run` the report is handed to a recording sink instead of the
/// configured backend.
pub async fn execute(config: &Config, locations: &[Location], dry_run: bool) -> Result<RunReport> {
    let source = source_from_config(&config.weather)?;
    let sink: Box<dyn StorageSink> = if dry_run {
        Box::new(RecordingSink::new())
    } else {
        sink_from_config(&config.storage)?
    };

    ForecastPipeline::new(source.as_ref(), sink.as_ref()).run_and_upload(locations).await
}

/// Parse a caller-supplied location set (JSON array).
pub fn parse_locations(raw: &[u8]) -> Result<Vec<Location>> {
    let locations: Vec<Location> = serde_json::from_slice(raw)
        .map_err(|e| Error::InvalidInput(format!("Invalid JSON location list: {e}")))?;
    validate_locations(&locations).map_err(Error::InvalidInput)?;
    Ok(locations)
}

/// Timer trigger: run now, then once per `every`, until `max_runs` is reached
/// (if given) or the process is interrupted. A failed run is logged and the
/// next tick starts a fresh, independent run.
pub async fn run_scheduled(config: &Config, every: Duration, max_runs: Option<u32>) -> u32 {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut runs = 0;

    loop {
        if max_runs.is_some_and(|max| runs >= max) {
            break;
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                runs += 1;
                tracing::info!(run = runs, "timer triggered WarmteCheck");
                match execute(config, &config.locations, false).await {
                    Ok(report) => tracing::info!(
                        places = report.results.len(),
                        "WarmteCheck finished successfully"
                    ),
                    Err(err) => tracing::error!(error = %err, "WarmteCheck failed"),
                }
            }
        }
    }

    runs
}
