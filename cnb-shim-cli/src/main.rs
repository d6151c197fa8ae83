#![doc = include_str!("../README.md")]

mod cli;
mod exit_code;
mod phases;

use crate::cli::{subcommand_args, Cli};
use clap::Parser;
use cnb_shim::support::log::Logger;
use std::env;
use std::path::Path;

// Suppress warnings due to the `unused_crate_dependencies` lint not handling integration tests well.
#[cfg(test)]
use assert_cmd as _;
#[cfg(test)]
use indoc as _;

/// Name of the environment variable that turns on debug output.
const DEBUG_ENV_VAR: &str = "BP_DEBUG";

fn main() {
    // Using `std::env::args_os()` instead of `std::env::current_exe()` since the latter resolves
    // symlinks to their target on some platforms, whereas we need the original filename.
    let args: Vec<_> = env::args_os().collect();
    let invoked_as = args.first().cloned().unwrap_or_default();
    let cli = Cli::parse_from(subcommand_args(args));

    let logger = Logger::stdout().with_debug(env::var_os(DEBUG_ENV_VAR).is_some());

    if let Err(error) = phases::run(&cli.phase, Path::new(&invoked_as), &logger) {
        logger.error(format!("Failed {} step: {error}", cli.phase.name()));
        std::process::exit(exit_code::UNSPECIFIED_ERROR);
    }
}
