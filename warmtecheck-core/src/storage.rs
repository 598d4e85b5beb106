use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    config::{StorageConfig, StorageKind},
    error::Result,
    model::RunReport,
};

pub mod azure_blob;
pub mod local;
pub mod recording;

pub use azure_blob::AzureBlobSink;
pub use local::LocalFileSink;
pub use recording::RecordingSink;

/// Destination for a finished report.
///
/// On success the report is durably recorded; on failure nothing partial is
/// left visible to readers.
#[async_trait]
pub trait StorageSink: Send + Sync + Debug {
    async fn upload(&self, report: &RunReport) -> Result<()>;
}

/// Construct the sink selected by `config.kind`.
pub fn sink_from_config(config: &StorageConfig) -> Result<Box<dyn StorageSink>> {
    let boxed: Box<dyn StorageSink> = match config.kind {
        StorageKind::Local => Box::new(LocalFileSink::new(config.local_path.clone())),
        StorageKind::AzureBlob => Box::new(AzureBlobSink::new(config)?),
    };

    Ok(boxed)
}
