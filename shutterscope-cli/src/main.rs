// ============================================================================
// shutterscope-cli/src/main.rs
// ============================================================================
//
// MAIN ENTRY POINT: Shutterscope CLI
//
// Parses arguments, initializes logging and dispatches to the subcommand
// implementations. Errors are printed once here and mapped to exit code 1.

use clap::Parser;
use std::process;

use shutterscope_cli::logging::init_logging;
use shutterscope_cli::{Cli, Commands, run_analyze, run_compare, run_live};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let result = match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Live(args) => run_live(args),
        Commands::Compare(args) => run_compare(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
