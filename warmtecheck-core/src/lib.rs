//! Core library for the WarmteCheck forecast job.
//!
//! This crate defines:
//! - The report model and the heating-index transform
//! - Configuration loading & validation
//! - Abstractions over weather sources and storage sinks
//! - The forecast pipeline composing them
//!
//! It is used by `warmtecheck-cli`, but can also be embedded in other triggers.

pub mod config;
pub mod error;
pub mod heating;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod storage;

pub use config::{Config, StorageConfig, StorageKind, WeatherConfig};
pub use error::{Error, Result};
pub use heating::heating_index;
pub use model::{ForecastEntry, HourlyReading, Location, LocationReport, RunReport};
pub use pipeline::ForecastPipeline;
pub use provider::{WeatherSource, source_from_config};
pub use storage::{StorageSink, sink_from_config};
