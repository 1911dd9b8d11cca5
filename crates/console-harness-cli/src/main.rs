//! console-harness: operator CLI for the console end-to-end harness
//!
//! ## Usage
//!
//! ```bash
//! console-harness config --json          # Resolved configuration, password masked
//! console-harness wait-backend           # Block until the REST API is up
//! console-harness list --kind databases  # Backend resources of one kind
//! console-harness cleanup --dry-run      # What a cleanup would delete
//! ```

use clap::Parser;
use console_harness::HarnessConfig;
use console_harness_cli::{
    handlers, Cli, CliConfig, CliResult, ColorChoice, Commands, Printer, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    console_harness::logging::init_with(config.verbosity.log_filter());
    let printer = Printer::new(&config);
    let harness = cli.target.apply(HarnessConfig::from_env()?);

    match cli.command {
        Commands::Config(args) => handlers::execute_config(&printer, &harness, &args),
        Commands::WaitBackend(args) => {
            let client = handlers::rest_client(&harness)?;
            block_on(handlers::execute_wait_backend(&printer, client, &args))
        }
        Commands::List(args) => {
            let client = handlers::rest_client(&harness)?;
            block_on(handlers::execute_list(&printer, &client, &args))
        }
        Commands::Cleanup(args) => {
            let client = handlers::rest_client(&harness)?;
            block_on(handlers::execute_cleanup(&printer, &client, &args))
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(ColorChoice::from(cli.color.clone()))
}

fn block_on<F>(future: F) -> CliResult<()>
where
    F: std::future::Future<Output = CliResult<()>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(future)
}
