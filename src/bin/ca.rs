//! ca: create a throwaway certificate authority and issue certificates
//! signed by it.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io;
use xkit::cli::{exit_with, install_panic_hook, setup_console, CaCli};
use xkit::config::load_config;
use xkit::error::Result;

fn main() {
    install_panic_hook("ca");

    let cli = CaCli::parse();
    let use_color = !cli.common.no_color;

    if let Err(e) = run(cli) {
        exit_with(e, use_color);
    }
}

fn run(cli: CaCli) -> Result<()> {
    if cli.common.run_env_commands(&mut io::stdout().lock())? {
        return Ok(());
    }
    if cli.command.is_none() {
        CaCli::command()
            .error(ErrorKind::MissingSubcommand, "a command is required: init or issue")
            .exit();
    }

    let config = load_config(cli.clone())?;
    setup_console("ca", &config)?;

    let issued = cli.run(&config)?;
    xkit::status!("wrote {}", issued.cert.display());
    xkit::status!("wrote {}", issued.key.display());
    println!("{}", issued.cert.display());
    Ok(())
}
