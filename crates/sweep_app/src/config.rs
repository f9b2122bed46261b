//! `hostsweep.ron` loading and the environment/flag overrides on top of it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sweep_engine::{CollectorSettings, FetchSettings, SinkSettings};
use sweep_logging::{sweep_debug, sweep_info};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "hostsweep.ron";
pub const ENDPOINT_ENV: &str = "HOSTSWEEP_ENDPOINT";
const DEFAULT_STATE_DIR: &str = ".hostsweep";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    pub collector: CollectorSettings,
    pub sink: SinkSettings,
    pub fetch: FetchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            collector: CollectorSettings::default(),
            sink: SinkSettings::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// The serializable subset of [`FetchSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = FetchSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            redirect_limit: defaults.redirect_limit,
            max_bytes: defaults.max_bytes,
        }
    }
}

impl FetchConfig {
    pub fn to_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            ..FetchSettings::default()
        }
    }
}

/// Reads the config file. An explicit path must exist; the default one is
/// optional.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if explicit.is_none() && err.kind() == std::io::ErrorKind::NotFound => {
            sweep_debug!("No {} found; using defaults", DEFAULT_CONFIG_FILE);
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading config {}", path.display()));
        }
    };
    let config = parse_config(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    sweep_info!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
    Ok(ron::from_str(content)?)
}

/// `HOSTSWEEP_ENDPOINT` replaces the file's endpoint; an empty value is
/// ignored.
pub fn apply_endpoint_env(config: &mut AppConfig, value: Option<&str>) -> Result<()> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(());
    };
    let endpoint =
        Url::parse(raw).with_context(|| format!("{ENDPOINT_ENV} is not a valid URL: {raw}"))?;
    config.sink.endpoint = Some(endpoint);
    Ok(())
}
