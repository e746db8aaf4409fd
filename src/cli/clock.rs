//! Arguments of the `clock` binary

use super::CommonArgs;
use crate::clock::{self, Zone};
use crate::config::{Config, ConfigOverrides};
use crate::error::Result;
use crate::utils::parse_duration;
use clap::{Parser, Subcommand};
use std::io::Write;

/// a simple timekeeping utility
#[derive(Parser, Debug, Clone)]
#[command(name = "clock", version = crate::LONG_VERSION, about)]
#[command(override_usage = "clock [-ncul] [-t <zone>] [LAYOUT]...\n       clock [OPTIONS] <COMMAND>")]
pub struct ClockCli {
    /// Do not print a newline (useful for pipes)
    #[arg(short = 'n', long = "noline", global = true)]
    pub noline: bool,

    /// Copy the output to the clipboard for easy paste
    #[arg(short = 'c', long = "copy", global = true)]
    pub copy: bool,

    /// Timezone as UTC, Local or an IANA database name [env: TZ]
    #[arg(short = 't', long = "tz", global = true, value_name = "ZONE")]
    pub tz: Option<String>,

    /// Shortcut for --tz UTC
    #[arg(short = 'u', long, global = true)]
    pub utc: bool,

    /// Shortcut for --tz Local
    #[arg(short = 'l', long, global = true)]
    pub local: bool,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Option<ClockCommand>,

    /// Layout name (json, code, date, kitchen, rfc822, ...) or strftime layout
    #[arg(value_name = "LAYOUT")]
    pub layout: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ClockCommand {
    /// Get the date or time after the specified duration
    After {
        /// Duration such as 90m, 1h30m or 2h45m10s
        duration: String,

        /// Layout name or strftime layout
        #[arg(value_name = "LAYOUT")]
        layout: Vec<String>,
    },
    /// Get the amount of time until the specified date/time
    Until {
        /// YYYY-MM-DD, YYYY-MM-DD HH:MM, YYYY-MM-DD HH:MM:SS or HH:MM
        #[arg(required = true, value_name = "DATETIME")]
        datetime: Vec<String>,
    },
}

impl ClockCli {
    /// Zone from the flags, falling back to the configured timezone
    pub fn zone(&self, config: &Config) -> Result<Zone> {
        Zone::select(&config.timezone, self.utc, self.local)
    }

    /// Produce the text this invocation prints
    pub fn render(&self, config: &Config) -> Result<String> {
        let zone = self.zone(config)?;
        match &self.command {
            None => clock::now(zone, &self.layout.join(" ")),
            Some(ClockCommand::After { duration, layout }) => {
                let delay = parse_duration(duration)?;
                clock::after(delay, zone, &layout.join(" "))
            }
            Some(ClockCommand::Until { datetime }) => clock::until(&datetime.join(" "), zone),
        }
    }
}

impl ClockCli {
    /// Copy `output` to the clipboard with `-c`, otherwise write it to `out`
    pub fn deliver<W: Write>(&self, output: &str, out: &mut W) -> Result<()> {
        if self.copy {
            return clock::copy_to_clipboard(output);
        }
        if self.noline {
            write!(out, "{}", output)?;
        } else {
            writeln!(out, "{}", output)?;
        }
        out.flush()?;
        Ok(())
    }
}

impl ConfigOverrides for ClockCli {
    fn apply(&self, config: &mut Config) -> Result<()> {
        self.common.apply(config);
        if let Some(tz) = &self.tz {
            config.timezone = tz.clone();
        }
        Ok(())
    }

    fn debug(&self) -> bool {
        self.common.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layout_words() {
        let cli = ClockCli::parse_from(["clock", "-n", "%H:%M", "%Z"]);
        assert!(cli.noline);
        assert!(cli.command.is_none());
        assert_eq!(cli.layout.join(" "), "%H:%M %Z");
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = ClockCli::parse_from(["clock", "-u", "until", "2030-01-01", "12:00"]);
        assert!(cli.utc);
        match cli.command {
            Some(ClockCommand::Until { datetime }) => assert_eq!(datetime.join(" "), "2030-01-01 12:00"),
            other => panic!("unexpected command {:?}", other),
        }

        let cli = ClockCli::parse_from(["clock", "after", "-n", "1h30m", "kitchen"]);
        assert!(cli.noline);
        match cli.command {
            Some(ClockCommand::After { duration, layout }) => {
                assert_eq!(duration, "1h30m");
                assert_eq!(layout, vec!["kitchen".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_zone_priority() {
        let config = Config {
            timezone: "Asia/Tokyo".to_string(),
            ..Default::default()
        };

        let cli = ClockCli::parse_from(["clock", "-u", "-l"]);
        assert_eq!(cli.zone(&config).unwrap(), Zone::Utc);

        let cli = ClockCli::parse_from(["clock"]);
        assert_eq!(cli.zone(&config).unwrap().to_string(), "Asia/Tokyo");
    }

    #[test]
    fn test_tz_flag_overrides_config() {
        let mut config = Config::default();
        let cli = ClockCli::parse_from(["clock", "--tz", "Europe/Paris", "--log-level", "warn"]);
        cli.apply(&mut config).unwrap();
        assert_eq!(config.timezone, "Europe/Paris");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_deliver_prints_or_copies() {
        let mut out = Vec::new();
        ClockCli::parse_from(["clock"]).deliver("12:00", &mut out).unwrap();
        assert_eq!(out, b"12:00\n");

        let mut out = Vec::new();
        ClockCli::parse_from(["clock", "-n"]).deliver("12:00", &mut out).unwrap();
        assert_eq!(out, b"12:00");

        // Copying never prints
        let mut out = Vec::new();
        let result = ClockCli::parse_from(["clock", "-c"]).deliver("12:00", &mut out);
        assert!(out.is_empty());
        if let Err(e) = result {
            assert_eq!(e.exit_code(), 1);
        }
    }

    #[test]
    fn test_render() {
        let config = Config::default();

        let cli = ClockCli::parse_from(["clock", "-u", "%Y"]);
        assert_eq!(cli.render(&config).unwrap().len(), 4);

        let cli = ClockCli::parse_from(["clock", "-u", "not a layout"]);
        assert!(cli.render(&config).is_err());

        let cli = ClockCli::parse_from(["clock", "-u", "after", "90x"]);
        assert!(cli.render(&config).is_err());

        let cli = ClockCli::parse_from(["clock", "-t", "Nowhere/Land"]);
        let mut config = Config::default();
        cli.apply(&mut config).unwrap();
        assert!(cli.render(&config).is_err());
    }
}
