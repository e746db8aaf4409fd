//! editor: open files in a command line editor on a temporary copy and only
//! replace the originals when the editor exits cleanly.

use clap::Parser;
use std::io;
use std::process;
use xkit::cli::{exit_with, install_panic_hook, setup_console, EditorCli};
use xkit::config::load_config;
use xkit::error::{AppError, ErrorReporter};

fn main() {
    install_panic_hook("editor");

    let cli = EditorCli::parse();
    let use_color = !cli.common.no_color;

    match cli.common.run_env_commands(&mut io::stdout().lock()) {
        Ok(true) => return,
        Ok(false) => {}
        Err(e) => exit_with(e, use_color),
    }

    if cli.paths.is_empty() {
        exit_with(AppError::validation("specify the path of the file you wish to edit"), use_color);
    }

    let config = match load_config(cli.clone()) {
        Ok(config) => config,
        Err(e) => exit_with(e, use_color),
    };
    if let Err(e) = setup_console("editor", &config) {
        exit_with(e, use_color);
    }

    let failures = cli.run(&config);
    if failures.is_empty() {
        return;
    }

    let code = failures.iter().map(|(_, e)| e.exit_code()).max().unwrap_or(1);
    let reporter = ErrorReporter::new(config.enable_color, false);
    for (path, error) in &failures {
        eprint!("{}: ", path.display());
        reporter.report_error(error);
    }
    if failures.len() > 1 {
        let errors: Vec<AppError> = failures.into_iter().map(|(_, e)| e).collect();
        eprintln!("{}", reporter.format_error_summary(&errors));
    }
    process::exit(code);
}
