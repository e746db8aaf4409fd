//! Command-line interfaces of the xkit binaries
//!
//! Each binary has its own clap parser; they share the logging flags in
//! [`CommonArgs`] and the startup/teardown helpers below.

pub mod ca;
pub mod clock;
pub mod editor;

pub use ca::CaCli;
pub use clock::ClockCli;
pub use editor::EditorCli;

use crate::config::{Config, EnvManager};
use crate::console::{self, LogFormat, LogLevel};
use crate::error::{AppError, ErrorReporter, Result};
use clap::Args;
use std::io;
use std::path::{Path, PathBuf};

/// Flags accepted by every binary
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Console level (trace, debug, info, status, warn, silent)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug output (same as --log-level debug)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Describe the supported environment variables and exit
    #[arg(long, global = true)]
    pub env_help: bool,

    /// Write an example .env file to PATH and exit
    #[arg(long, global = true, value_name = "PATH")]
    pub env_example: Option<PathBuf>,

    /// Check ./.env and the current environment for invalid values and exit
    #[arg(long, global = true)]
    pub check_env: bool,
}

impl CommonArgs {
    /// Apply the logging flags on top of `config`
    pub fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.debug {
            config.log_level = LogLevel::Debug.as_str().to_string();
        }
        if self.no_color {
            config.enable_color = false;
        }
    }

    /// Handle the environment helper flags. Returns true when one was
    /// handled and the binary should exit without doing its work.
    pub fn run_env_commands<W: io::Write>(&self, out: &mut W) -> Result<bool> {
        if self.env_help {
            writeln!(out, "{}", EnvManager::display_env_help())?;
            writeln!(out, "Example .env file:\n")?;
            write!(out, "{}", EnvManager::create_example_env_content())?;
            return Ok(true);
        }

        if let Some(path) = &self.env_example {
            EnvManager::save_example_env_file(path)?;
            writeln!(out, "wrote example configuration to {}", path.display())?;
            return Ok(true);
        }

        if self.check_env {
            let mut warnings = EnvManager::validate_current_env()?;
            if let Some(lines) = EnvManager::check_env_file(Path::new(".env"))? {
                warnings.extend(lines);
            }
            if warnings.is_empty() {
                writeln!(out, "environment configuration is valid")?;
                return Ok(true);
            }
            for warning in &warnings {
                writeln!(out, "{}", warning)?;
            }
            return Err(AppError::config(format!(
                "found {} invalid environment value(s)",
                warnings.len()
            )));
        }

        Ok(false)
    }
}

/// Route the console to stderr with the configured level and colors, so
/// diagnostics never mix with a tool's output.
pub fn setup_console(prefix: &str, config: &Config) -> Result<()> {
    let level = config.level()?;
    let console = console::global();
    console.set_sink(Box::new(io::stderr()));
    console.init(prefix, LogFormat::Console);
    console.set_level(level);
    console.set_color(config.enable_color);
    if !config.enable_color {
        colored::control::set_override(false);
    }
    Ok(())
}

/// Exit with a short message on panic instead of a backtrace
pub fn install_panic_hook(name: &'static str) {
    std::panic::set_hook(Box::new(move |panic_info| {
        eprintln!("{} panicked: {}", name, panic_info);
        std::process::exit(99);
    }));
}

/// Print the error with suggestions and exit with its code
pub fn exit_with(error: AppError, use_color: bool) -> ! {
    ErrorReporter::new(use_color, false).report_error(&error);
    print_error_suggestions(&error);
    std::process::exit(error.exit_code());
}

/// Print helpful suggestions for common errors
pub fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - LOG_LEVEL must be one of trace, debug, info, status, warn, silent");
            eprintln!("  - ENABLE_COLOR must be true or false");
        }
        AppError::AlreadyExists(_) => {
            eprintln!();
            eprintln!("Use --force to overwrite existing files.");
        }
        AppError::Certificate(_) => {
            eprintln!();
            eprintln!("Certificate help:");
            eprintln!("  - Run `ca init` to create the certificate authority first");
            eprintln!("  - Check --certs or $CA_CERT_DIRECTORY");
        }
        AppError::Editor(_) => {
            eprintln!();
            eprintln!("Editor help:");
            eprintln!("  - Pass an editor with -e or set $EDITOR");
            eprintln!("  - Make sure the editor is on your $PATH");
        }
        _ => {}
    }
}
