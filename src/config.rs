use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::{Context, OptionExt};
use serde::{Deserialize, Serialize};

use crate::spotify_rs::auth::SPOTIFY_TOKEN_URL;
use crate::spotify_rs::client::SPOTIFY_SEARCH_URL;

const APP_DIR: &str = "release-matcher";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog market used to filter search results
    pub market: String,
    pub search_limit: u32,
    pub request_timeout_secs: u64,
    pub renewal_interval_mins: u64,
    /// Where credentials, the cached token and the on/off toggle are kept
    pub state_file: Option<String>,
    pub token_url: String,
    pub search_url: String,
    /// OTLP collector for trace export, e.g. `http://localhost:4317`
    pub otlp_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            market: "US".to_string(),
            search_limit: 20,
            request_timeout_secs: 10,
            renewal_interval_mins: 50,
            state_file: None,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            search_url: SPOTIFY_SEARCH_URL.to_string(),
            otlp_endpoint: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join(APP_DIR).join("config.toml"))
    }

    /// Load the default config file, or built-in defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the defaults to the default location unless a file already exists
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory on this platform")?;
        if path.exists() {
            tracing::info!("Config already exists at {}", path.display());
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents =
            toml::to_string_pretty(&Self::default()).wrap_err("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn state_file_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(Self::expand_path(path)),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR).join("state.json"))
                .ok_or_eyre("No data directory on this platform, set `state_file` in the config"),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn renewal_interval(&self) -> Duration {
        Duration::from_secs(self.renewal_interval_mins * 60)
    }
}
