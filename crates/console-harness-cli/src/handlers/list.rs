//! List command handler

use crate::error::CliResult;
use crate::output::Printer;
use crate::ListArgs;
use console_harness::{ResourceKind, RestClient, TEARDOWN_ORDER};

/// Kinds to list, in teardown order
#[must_use]
pub fn kinds_to_list(args: &ListArgs) -> Vec<ResourceKind> {
    match args.kind {
        Some(kind) => vec![kind.into()],
        None => TEARDOWN_ORDER.to_vec(),
    }
}

/// Execute the list command
///
/// # Errors
///
/// Returns error on the first listing that fails
pub async fn execute_list(printer: &Printer, client: &RestClient, args: &ListArgs) -> CliResult<()> {
    for kind in kinds_to_list(args) {
        let names = client.list(kind).await?;
        printer.listing(kind, &names);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::KindArg;

    #[test]
    fn test_all_kinds_in_teardown_order() {
        let kinds = kinds_to_list(&ListArgs { kind: None });
        assert_eq!(kinds.first(), Some(&ResourceKind::Backups));
        assert_eq!(kinds.last(), Some(&ResourceKind::Users));
    }

    #[test]
    fn test_single_kind() {
        let kinds = kinds_to_list(&ListArgs {
            kind: Some(KindArg::Projects),
        });
        assert_eq!(kinds, vec![ResourceKind::Projects]);
    }
}
