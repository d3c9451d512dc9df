//! slo command-line entry point
//!
//! Parses arguments, installs the logger and delegates to [`slo_cli::run`].

use clap::Parser as ClapParser;
use slo_cli::Cli;

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    if let Err(error) = slo_cli::run(&cli) {
        eprint!("{}", error.report());
        std::process::exit(error.exit_code());
    }
}
