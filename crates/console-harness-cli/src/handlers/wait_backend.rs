//! Wait-backend command handler

use crate::error::CliResult;
use crate::output::Printer;
use crate::WaitBackendArgs;
use console_harness::{ErrorKind, RestClient, RetrySpec};
use std::time::Duration;

/// Connect-only retry policy for the given arguments
#[must_use]
pub const fn wait_spec(args: &WaitBackendArgs) -> RetrySpec {
    RetrySpec::new(args.attempts, Duration::from_millis(args.delay_ms)).only(ErrorKind::Connect)
}

/// Execute the wait-backend command.
///
/// Any HTTP answer, even an error status, proves the endpoint is up.
///
/// # Errors
///
/// Returns error if the endpoint still refuses connections after the last attempt
pub async fn execute_wait_backend(
    printer: &Printer,
    client: RestClient,
    args: &WaitBackendArgs,
) -> CliResult<()> {
    let client = client.with_connect_retry(wait_spec(args));
    tracing::info!(url = client.base_url(), attempts = args.attempts, "waiting for backend");
    match client.wait_until_reachable().await {
        Ok(()) => {}
        Err(err) if err.last_failure().kind() == ErrorKind::Http => {
            tracing::debug!(error = %err, "backend answered with an error status");
        }
        Err(err) => return Err(err.into()),
    }
    printer.success(&format!("backend reachable at {}", client.base_url()));
    Ok(())
}
