use async_trait::async_trait;
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use crate::{error::Result, model::RunReport};

use super::StorageSink;

/// Sink that performs no I/O and only remembers what it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: AtomicUsize,
    last_payload: Mutex<Option<RunReport>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<RunReport> {
        self.last_payload.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl StorageSink for RecordingSink {
    async fn upload(&self, report: &RunReport) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap_or_else(PoisonError::into_inner) = Some(report.clone());
        tracing::debug!(places = report.results.len(), "recording sink received report");
        Ok(())
    }
}
