use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::{Error, Result},
    model::{Location, default_locations, validate_locations},
};

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOCAL_PATH: &str = "./output";
pub const DEFAULT_CONTAINER: &str = "warmtecheck";
pub const DEFAULT_OUTPUT_NAME: &str = "latest.json";
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 30;

/// Which storage backend receives the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    #[default]
    Local,
    AzureBlob,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::AzureBlob => "azure_blob",
        }
    }

    pub const fn all() -> &'static [StorageKind] {
        &[StorageKind::Local, StorageKind::AzureBlob]
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StorageKind {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(StorageKind::Local),
            "azure_blob" | "azure" | "cloud" => Ok(StorageKind::AzureBlob),
            _ => Err(Error::Configuration(format!(
                "Unknown storage type '{value}'. Supported types: local, azure_blob."
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { api_base_url: DEFAULT_WEATHER_API_URL.to_string(), timeout_secs: DEFAULT_TIMEOUT_SECS }
    }
}

impl WeatherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Output directory for the local backend.
    pub local_path: PathBuf,
    pub account_name: Option<String>,
    pub container_name: String,
    /// Blob name written (and overwritten) by the Azure backend.
    pub output_name: String,
    /// Overrides `https://<account>.blob.core.windows.net`, e.g. for an emulator.
    pub blob_endpoint: Option<String>,
    pub sas_token: Option<String>,
    pub bearer_token: Option<String>,
    /// Per-request timeout for the Azure backend.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Local,
            local_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            account_name: None,
            container_name: DEFAULT_CONTAINER.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            blob_endpoint: None,
            sas_token: None,
            bearer_token: None,
            timeout_secs: DEFAULT_STORAGE_TIMEOUT_SECS,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration, assembled once at process start.
///
/// Example TOML:
/// ```toml
/// [weather]
/// timeout_secs = 5
///
/// [storage]
/// kind = "azure_blob"
/// account_name = "mystorage"
///
/// [[locations]]
/// name = "Eindhoven"
/// lat = 51.44
/// lon = 5.47
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherConfig,
    pub storage: StorageConfig,
    pub locations: Vec<Location>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            storage: StorageConfig::default(),
            locations: default_locations(),
        }
    }
}

impl Config {
    /// Load the TOML file (explicit path or the platform default), then apply
    /// `.env` and process environment overrides, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        let mut cfg = Self::load_file(&path)?;

        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Read a config file, or return defaults if it doesn't exist yet.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Apply `KEY=value` overrides. `lookup` is normally the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("WEATHER_API_BASE_URL") {
            self.weather.api_base_url = url;
        }
        if let Some(raw) = get("WEATHER_API_TIMEOUT") {
            self.weather.timeout_secs = raw.parse().map_err(|_| {
                Error::Configuration(format!(
                    "WEATHER_API_TIMEOUT must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }
        if let Some(kind) = get("STORAGE_TYPE") {
            self.storage.kind = StorageKind::try_from(kind.as_str())?;
        }
        if let Some(path) = get("LOCAL_STORAGE_PATH") {
            self.storage.local_path = PathBuf::from(path);
        }
        if let Some(account) = get("STORAGE_ACCOUNT_NAME") {
            self.storage.account_name = Some(account);
        }
        if let Some(container) = get("STORAGE_CONTAINER") {
            self.storage.container_name = container;
        }
        if let Some(name) = get("OUTPUT_BLOB") {
            self.storage.output_name = name;
        }
        if let Some(endpoint) = get("STORAGE_BLOB_ENDPOINT") {
            self.storage.blob_endpoint = Some(endpoint);
        }
        if let Some(sas) = get("STORAGE_SAS_TOKEN") {
            self.storage.sas_token = Some(sas);
        }
        if let Some(token) = get("STORAGE_BEARER_TOKEN") {
            self.storage.bearer_token = Some(token);
        }
        if let Some(raw) = get("STORAGE_TIMEOUT") {
            self.storage.timeout_secs = raw.parse().map_err(|_| {
                Error::Configuration(format!(
                    "STORAGE_TIMEOUT must be a whole number of seconds, got '{raw}'"
                ))
            })?;
        }
        if let Some(raw) = get("LOCATIONS_JSON") {
            self.locations = serde_json::from_str(&raw).map_err(|e| {
                Error::Configuration(format!("Failed to parse LOCATIONS_JSON: {e}"))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.weather.timeout_secs == 0 {
            return Err(Error::Configuration("weather timeout must be at least 1 second".into()));
        }
        reqwest::Url::parse(&self.weather.api_base_url).map_err(|e| {
            Error::Configuration(format!(
                "invalid weather API base URL '{}': {e}",
                self.weather.api_base_url
            ))
        })?;

        validate_locations(&self.locations).map_err(Error::Configuration)?;

        if self.storage.kind == StorageKind::AzureBlob {
            let has_account =
                self.storage.account_name.as_deref().is_some_and(|a| !a.trim().is_empty());
            if !has_account {
                return Err(Error::Configuration(
                    "Azure storage selected but no account name is configured.\n\
                     Hint: set STORAGE_ACCOUNT_NAME or run `warmtecheck configure`."
                        .into(),
                ));
            }
            if self.storage.container_name.trim().is_empty() {
                return Err(Error::Configuration("storage container name must not be empty".into()));
            }
            if self.storage.output_name.trim().is_empty() {
                return Err(Error::Configuration("output blob name must not be empty".into()));
            }
            if self.storage.timeout_secs == 0 {
                return Err(Error::Configuration(
                    "storage timeout must be at least 1 second".into(),
                ));
            }
        }

        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Configuration(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let toml = toml::to_string_pretty(self).map_err(|e| {
            Error::Configuration(format!("Failed to serialize configuration to TOML: {e}"))
        })?;

        fs::write(&path, toml).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {e}", path.display()))
        })?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "warmtecheck", "warmtecheck").ok_or_else(|| {
            Error::Configuration("Could not determine platform config directory".into())
        })?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
