//! Configuration parsing from CLI arguments and environment variables

use crate::config::env::EnvManager;
use crate::config::model::Config;
use crate::error::Result;

/// Command line arguments that can override configuration values
pub trait ConfigOverrides {
    /// Apply explicitly given arguments on top of `config`
    fn apply(&self, config: &mut Config) -> Result<()>;

    /// Whether configuration loading should report what it does
    fn debug(&self) -> bool {
        false
    }
}

/// Layers defaults, the .env file, the environment and CLI arguments
pub struct ConfigParser<C> {
    cli: C,
}

impl<C: ConfigOverrides> ConfigParser<C> {
    pub fn new(cli: C) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug())?;

        config.merge_from_env()?;

        self.cli.apply(&mut config)?;

        config.validate()?;

        if self.cli.debug() {
            crate::debug!("final configuration:\n{}", display_config_summary(&config));
        }

        Ok(config)
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config<C: ConfigOverrides>(cli: C) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    fn or_unset<T: std::fmt::Display>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "(unset)".to_string())
    }

    let summary = [
        format!("Log Level: {}", config.log_level),
        format!("Color Output: {}", config.enable_color),
        format!("Peers Path: {}", or_unset(config.peers_path.as_ref().map(|p| p.display()))),
        format!("Peers Sync URL: {}", or_unset(config.peers_sync_url.as_ref())),
        format!(
            "Peers Sync API Key: {}",
            if config.peers_sync_apikey.is_some() { "(set)" } else { "(unset)" }
        ),
        format!("Certificate Directory: {}", config.cert_directory.display()),
        format!("Editor: {}", or_unset(config.editor.as_ref())),
        format!("Timezone: {}", config.timezone),
    ];

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::env;
    use std::path::PathBuf;

    #[derive(Default)]
    struct Overrides {
        log_level: Option<String>,
        timezone: Option<String>,
        fail: bool,
    }

    impl ConfigOverrides for Overrides {
        fn apply(&self, config: &mut Config) -> Result<()> {
            if self.fail {
                return Err(AppError::validation("bad arguments"));
            }
            if let Some(level) = &self.log_level {
                config.log_level = level.clone();
            }
            if let Some(tz) = &self.timezone {
                config.timezone = tz.clone();
            }
            Ok(())
        }
    }

    fn clear_env() {
        for (var, _, _) in EnvManager::get_supported_env_vars() {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_parse_defaults() {
        let _guard = crate::ENV_LOCK.lock();
        clear_env();

        let config = load_config(Overrides::default()).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.cert_directory, PathBuf::from("fixtures/certs"));
    }

    #[test]
    fn test_env_then_cli_priority() {
        let _guard = crate::ENV_LOCK.lock();
        clear_env();
        env::set_var("LOG_LEVEL", "debug");
        env::set_var("TZ", "Asia/Tokyo");
        env::set_var("CA_CERT_DIRECTORY", "/tmp/xkit-certs");

        let config = load_config(Overrides {
            log_level: Some("warn".to_string()),
            ..Default::default()
        });
        clear_env();
        let config = config.unwrap();

        // CLI beats environment, environment beats defaults
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert_eq!(config.cert_directory, PathBuf::from("/tmp/xkit-certs"));
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = crate::ENV_LOCK.lock();
        clear_env();
        env::set_var("ENABLE_COLOR", "sometimes");

        let result = load_config(Overrides::default());
        clear_env();
        assert_eq!(result.unwrap_err().category(), "CONFIG");
    }

    #[test]
    fn test_override_errors_propagate() {
        let _guard = crate::ENV_LOCK.lock();
        clear_env();

        let result = load_config(Overrides {
            fail: true,
            ..Default::default()
        });
        assert!(result.unwrap_err().to_string().contains("bad arguments"));
    }

    #[test]
    fn test_validation_after_overrides() {
        let _guard = crate::ENV_LOCK.lock();
        clear_env();

        let result = load_config(Overrides {
            log_level: Some("shouting".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());

        let result = load_config(Overrides {
            timezone: Some("  ".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_config_summary() {
        let config = Config {
            peers_sync_apikey: Some("secret".to_string()),
            ..Default::default()
        };
        let summary = display_config_summary(&config);

        assert!(summary.contains("Log Level: info"));
        assert!(summary.contains("Peers Path: (unset)"));
        assert!(summary.contains("Peers Sync API Key: (set)"));
        assert!(!summary.contains("secret"));
        assert!(summary.contains("Timezone: Local"));
    }
}
