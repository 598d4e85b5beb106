use thiserror::Error;

/// Failures surfaced by the forecast job.
///
/// Every variant is terminal for the current run: nothing in this crate
/// retries, and the pipeline propagates the first error it sees.
#[derive(Debug, Error)]
pub enum Error {
    /// A required configuration value is absent or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The weather provider could not be reached, timed out or is failing.
    #[error("weather provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The weather provider answered, but not in the expected shape.
    #[error("weather provider protocol error: {0}")]
    UpstreamProtocol(String),

    /// The storage destination could not be created, reached or authorized.
    #[error("storage unavailable: {0}")]
    SinkUnavailable(String),

    /// Writing the report to storage failed part-way.
    #[error("storage write failed: {0}")]
    SinkWrite(String),

    /// A caller-supplied location set is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_) | Error::UpstreamProtocol(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
