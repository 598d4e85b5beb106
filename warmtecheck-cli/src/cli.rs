use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Select, Text};
use std::{path::PathBuf, sync::Arc, time::Duration};
use warmtecheck_core::{Config, StorageKind};

use crate::{server, trigger};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "warmtecheck", version, about = "Hourly heating-index forecast job")]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the forecast job once and print the report.
    Run {
        /// JSON array of locations overriding the configured set.
        #[arg(long)]
        locations: Option<String>,

        /// Build the report but don't persist it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the job on a fixed interval until interrupted.
    Schedule {
        /// Seconds between runs.
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,

        /// Stop after this many runs.
        #[arg(long)]
        count: Option<u32>,
    },

    /// Serve the HTTP trigger.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Interactively configure the storage backend.
    Configure,

    /// Print the default config file path.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run { locations, dry_run } => {
                let config = Config::load(self.config.as_deref())?;
                let locations = match locations {
                    Some(raw) => trigger::parse_locations(raw.as_bytes())?,
                    None => config.locations.clone(),
                };

                let report = trigger::execute(&config, &locations, dry_run).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Command::Schedule { every, count } => {
                let config = Config::load(self.config.as_deref())?;
                let runs = trigger::run_scheduled(&config, Duration::from_secs(every), count).await;
                tracing::info!(runs, "scheduler stopped");
            }
            Command::Serve { bind } => {
                let config = Config::load(self.config.as_deref())?;
                let app = server::router(server::HttpState { config: Arc::new(config) });

                let listener = tokio::net::TcpListener::bind(&bind)
                    .await
                    .with_context(|| format!("Failed to bind {bind}"))?;
                tracing::info!(bind = %bind, "warmtecheck HTTP trigger listening");

                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = tokio::signal::ctrl_c().await;
                        tracing::info!("shutdown signal received");
                    })
                    .await?;
            }
            Command::Configure => configure(self.config)?,
            Command::ConfigPath => println!("{}", Config::config_file_path()?.display()),
        }

        Ok(())
    }
}

fn configure(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p,
        None => Config::config_file_path()?,
    };
    let mut config = Config::load_file(&path)?;

    let kinds: Vec<&str> = StorageKind::all().iter().map(StorageKind::as_str).collect();
    let kind = Select::new("Storage backend:", kinds).prompt()?;
    config.storage.kind = StorageKind::try_from(kind)?;

    match config.storage.kind {
        StorageKind::Local => {
            let dir = Text::new("Output directory:")
                .with_default(&config.storage.local_path.display().to_string())
                .prompt()?;
            config.storage.local_path = PathBuf::from(dir);
        }
        StorageKind::AzureBlob => {
            let account = Text::new("Storage account name:")
                .with_default(config.storage.account_name.as_deref().unwrap_or_default())
                .prompt()?;
            config.storage.account_name = Some(account);
            config.storage.container_name = Text::new("Container:")
                .with_default(&config.storage.container_name)
                .prompt()?;
            config.storage.output_name = Text::new("Blob name:")
                .with_default(&config.storage.output_name)
                .prompt()?;
        }
    }

    config.validate()?;
    let written = config.save(Some(&path))?;
    println!("Configuration saved to {}", written.display());
    Ok(())
}
