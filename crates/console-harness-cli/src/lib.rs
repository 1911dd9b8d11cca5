//! console-harness CLI library
//!
//! Operator commands around the harness: inspect the resolved
//! configuration, wait for the REST backend, list backend resources and
//! clean up whatever a crashed test run left behind.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    CleanupArgs, Cli, ColorArg, Commands, ConfigArgs, KindArg, ListArgs, TargetArgs,
    WaitBackendArgs,
};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{yes_no, Printer};
