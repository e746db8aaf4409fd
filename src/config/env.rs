//! Environment variable handling and .env file management

use crate::console::LogLevel;
use crate::error::{AppError, Result};
use std::path::Path;
use std::str::FromStr;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                crate::debug!("loaded configuration from .env file");
            }
        } else if debug {
            crate::debug!("no .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# xkit Configuration
#
# Environment variables read by the clock, editor and ca tools. Values set
# here are used as defaults and can be overridden on the command line.

# Console level: trace, debug, info, status, warn or silent
# LOG_LEVEL=info

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Location of peers.json, checked before ./peers.json and ~/.fluidfs/peers.json
# PEERS_PATH=/etc/fluidfs/peers.json

# Remote peers document and the API key used to fetch it
# PEERS_SYNC_URL=https://example.com/peers
# PEERS_SYNC_APIKEY=changeme

# Directory holding ca.crt, ca.key and issued certificates
# CA_CERT_DIRECTORY=fixtures/certs

# Editor used by the editor tool
# EDITOR=vim

# Timezone for the clock: UTC, Local or an IANA name
# TZ=America/New_York
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "LOG_LEVEL" => {
                LogLevel::from_str(value)
                    .map_err(|_| AppError::config(format!("Invalid LOG_LEVEL value '{}'", value)))?;
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            "PEERS_SYNC_URL" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(AppError::config(format!(
                        "PEERS_SYNC_URL must use http or https: {}",
                        value
                    )));
                }
            }
            "PEERS_PATH" | "CA_CERT_DIRECTORY" | "EDITOR" | "PEERS_SYNC_APIKEY" => {
                if value.trim().is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            "TZ" => {
                crate::clock::Zone::parse(value)
                    .map_err(|_| AppError::config(format!("Invalid TZ value '{}'", value)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("LOG_LEVEL", "Minimum console level", "debug"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
            ("PEERS_PATH", "Path to peers.json", "/etc/fluidfs/peers.json"),
            ("PEERS_SYNC_URL", "URL serving the peers document", "https://example.com/peers"),
            ("PEERS_SYNC_APIKEY", "API key for the peers sync URL", "changeme"),
            ("CA_CERT_DIRECTORY", "Directory for CA and issued certificates", "fixtures/certs"),
            ("EDITOR", "Editor name or path", "vim"),
            ("TZ", "Clock timezone (UTC, Local or IANA name)", "Europe/Paris"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        Ok(warnings)
    }

    /// Check a .env file and report invalid lines; `None` when it is absent
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read .env file: {}", e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                if let Err(e) = Self::validate_env_var(key, value) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
