// shutterscope-cli/src/lib.rs
//
// Library portion of the Shutterscope CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{AnalyzeArgs, Cli, Commands, CompareArgs, LiveArgs, MethodArg};
pub use commands::analyze::run_analyze;
pub use commands::compare::run_compare;
pub use commands::live::run_live;
pub use error::{CliErrorContext, CliResult};
