//! Command implementations for the Shutterscope CLI.
//!
//! Each subcommand lives in its own module and receives its parsed clap
//! arguments; all measurement work is delegated to shutterscope-core.

pub mod analyze;
pub mod compare;
pub mod live;
