use async_trait::async_trait;
use chrono::Utc;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::{
    error::{Error, Result},
    model::RunReport,
};

use super::StorageSink;

/// Upper bound on `-<n>` suffixes tried when a file name is already taken.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Writes each report to
/// `<output_dir>/<YYYYmmdd_HHMMSS_ffffff>_warmtecheck.json`.
///
/// Every upload stages its bytes in its own temp file and links it into
/// place without replacing an existing report, so overlapping runs each get
/// their own complete file and readers never observe a half-written one.
#[derive(Debug, Clone)]
pub struct LocalFileSink {
    output_dir: PathBuf,
}

impl LocalFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn file_name(stamp: &str, attempt: u32) -> String {
        match attempt {
            0 => format!("{stamp}_warmtecheck.json"),
            n => format!("{stamp}-{n}_warmtecheck.json"),
        }
    }

    fn write_report(dir: &Path, stamp: &str, json: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::SinkUnavailable(format!(
                "Failed to create output directory {}: {e}",
                dir.display()
            ))
        })?;

        let write_err =
            |e: io::Error| Error::SinkWrite(format!("Failed to stage report in {}: {e}", dir.display()));
        let mut tmp = tempfile::Builder::new()
            .prefix(".warmtecheck-")
            .suffix(".json.tmp")
            .tempfile_in(dir)
            .map_err(write_err)?;
        tmp.write_all(json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        let mut attempt = 0;
        loop {
            let path = dir.join(Self::file_name(stamp, attempt));
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists
                    && attempt < MAX_NAME_ATTEMPTS =>
                {
                    tmp = e.file;
                    attempt += 1;
                }
                // Dropping the returned NamedTempFile removes the staged file.
                Err(e) => {
                    return Err(Error::SinkWrite(format!(
                        "Failed to move {} into place: {}",
                        path.display(),
                        e.error
                    )));
                }
            }
        }
    }
}

#[async_trait]
impl StorageSink for LocalFileSink {
    async fn upload(&self, report: &RunReport) -> Result<()> {
        let json = serde_json::to_vec_pretty(report)
            .map_err(|e| Error::SinkWrite(format!("Failed to serialize report: {e}")))?;

        let dir = self.output_dir.clone();
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let path = tokio::task::spawn_blocking(move || Self::write_report(&dir, &stamp, &json))
            .await
            .map_err(|e| Error::SinkWrite(format!("Local write task failed: {e}")))??;

        tracing::info!(path = %path.display(), "report saved to local file");
        Ok(())
    }
}
