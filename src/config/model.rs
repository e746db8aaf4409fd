//! Configuration data model and validation

use crate::console::LogLevel;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Settings shared by the xkit binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum console level (trace, debug, info, status, warn, silent)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Explicit location of peers.json
    #[serde(default)]
    pub peers_path: Option<PathBuf>,

    /// Endpoint serving the peers document
    #[serde(default)]
    pub peers_sync_url: Option<String>,

    /// API key sent when syncing peers
    #[serde(default)]
    pub peers_sync_apikey: Option<String>,

    /// Directory holding the CA pair and issued certificates
    #[serde(default = "default_cert_directory")]
    pub cert_directory: PathBuf,

    /// Editor name or path
    #[serde(default)]
    pub editor: Option<String>,

    /// Timezone used by the clock
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            enable_color: default_enable_color(),
            peers_path: None,
            peers_sync_url: None,
            peers_sync_apikey: None,
            cert_directory: default_cert_directory(),
            editor: None,
            timezone: default_timezone(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed console level
    pub fn level(&self) -> Result<LogLevel> {
        LogLevel::from_str(&self.log_level)
            .map_err(|e| AppError::config(format!("Invalid log level '{}': {}", self.log_level, e)))
    }

    /// Validate the configuration and return the first problem
    pub fn validate(&self) -> Result<()> {
        self.level()?;

        if self.cert_directory.as_os_str().is_empty() {
            return Err(AppError::config("Certificate directory cannot be empty"));
        }

        if let Some(url) = self.peers_sync_url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::config(format!("Peers sync URL must use http or https: {}", url)));
            }
        }

        if self.timezone.trim().is_empty() {
            return Err(AppError::config("Timezone cannot be empty"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration. Empty values
    /// are ignored.
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(level) = env_var("LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(path) = env_var(crate::peers::PEERS_PATH_VAR) {
            self.peers_path = Some(PathBuf::from(path));
        }

        if let Some(url) = env_var("PEERS_SYNC_URL") {
            self.peers_sync_url = Some(url);
        }

        if let Some(apikey) = env_var("PEERS_SYNC_APIKEY") {
            self.peers_sync_apikey = Some(apikey);
        }

        if let Some(dir) = env_var("CA_CERT_DIRECTORY") {
            self.cert_directory = PathBuf::from(dir);
        }

        if let Some(editor) = env_var("EDITOR") {
            self.editor = Some(editor);
        }

        if let Some(tz) = env_var("TZ") {
            self.timezone = tz;
        }

        // Parsed last so a bad value leaves the other settings merged
        if let Some(enable_color) = env_var("ENABLE_COLOR") {
            self.enable_color = enable_color
                .parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Default value functions for serde
fn default_log_level() -> String {
    crate::defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_cert_directory() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_CERT_DIRECTORY)
}

fn default_timezone() -> String {
    crate::defaults::DEFAULT_TIMEZONE.to_string()
}
