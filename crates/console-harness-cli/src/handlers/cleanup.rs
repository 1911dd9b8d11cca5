//! Cleanup command handler

use crate::error::{CliError, CliResult};
use crate::output::Printer;
use crate::CleanupArgs;
use console_harness::{CleanupStrategy, ResourceKind, ResourceTracker, RestClient, TEARDOWN_ORDER};

/// Names a relist teardown would delete for one kind
#[must_use]
pub fn cleanup_targets(kind: ResourceKind, names: Vec<String>, protected_user: &str) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| kind != ResourceKind::Users || name != protected_user)
        .collect()
}

/// Execute the cleanup command
///
/// # Errors
///
/// Returns error if a listing fails during a dry run, or if any deletion failed
pub async fn execute_cleanup(
    printer: &Printer,
    client: &RestClient,
    args: &CleanupArgs,
) -> CliResult<()> {
    let protected_user = client.credential().qualified_user();

    if args.dry_run {
        printer.header(&format!("Would delete (keeping {protected_user}):"));
        for kind in TEARDOWN_ORDER {
            let names = cleanup_targets(kind, client.list(kind).await?, &protected_user);
            printer.listing(kind, &names);
        }
        return Ok(());
    }

    let mut tracker = ResourceTracker::new(CleanupStrategy::relist(protected_user));
    let report = tracker.teardown_all(client).await;
    printer.report(&report);
    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::CleanupIncomplete {
            deletions: report.failures.len(),
            listings: report.listing_failures.len(),
        })
    }
}
