//! clock: print the current time in a layout, the time after a duration,
//! or how long until a date.

use clap::Parser;
use std::io;
use xkit::cli::{exit_with, install_panic_hook, setup_console, ClockCli};
use xkit::config::load_config;
use xkit::error::Result;

fn main() {
    install_panic_hook("clock");

    let cli = ClockCli::parse();
    let use_color = !cli.common.no_color;

    if let Err(e) = run(cli) {
        exit_with(e, use_color);
    }
}

fn run(cli: ClockCli) -> Result<()> {
    if cli.common.run_env_commands(&mut io::stdout().lock())? {
        return Ok(());
    }

    let config = load_config(cli.clone())?;
    setup_console("clock", &config)?;

    let output = cli.render(&config)?;
    xkit::debug!("rendered {:?} in {}", output, cli.zone(&config)?);

    cli.deliver(&output, &mut io::stdout().lock())?;
    Ok(())
}
