//! `sharehost` binary: parse arguments, then dispatch to a command.
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use sharehost::cli::{Cli, Command};
use sharehost::commands;
use sharehost::logging::{Logger, init_subscriber};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    if args.command == Command::Version {
        commands::version::run();
        return ExitCode::SUCCESS;
    }

    init_subscriber(args.verbose, args.command.name(), args.log_format);
    let log = Arc::new(Logger::new(args.command.name()));

    let result = match args.command {
        Command::Run => commands::run::run(&args.global, &log),
        Command::Plan => commands::plan::run(&args.global, log.as_ref()),
        Command::Check => commands::check::run(&args.global, log.as_ref()),
        Command::Version => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
