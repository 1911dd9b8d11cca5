//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module holds the execution logic for one command plus the
//! pure helpers it is built from.

pub mod cleanup;
pub mod config;
pub mod list;
pub mod wait_backend;

pub use cleanup::{cleanup_targets, execute_cleanup};
pub use config::{execute_config, ConfigView, PASSWORD_MASK};
pub use list::execute_list;
pub use wait_backend::{execute_wait_backend, wait_spec};

use crate::error::{CliError, CliResult};
use console_harness::{HarnessConfig, RestClient};

/// REST client authenticated as the configured bootstrap user
///
/// # Errors
///
/// Returns error if the REST URL is not http(s) or the HTTP client cannot be
/// built
pub fn rest_client(config: &HarnessConfig) -> CliResult<RestClient> {
    let url = config.rest_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CliError::config(format!(
            "REST URL must start with http:// or https://, got '{url}'"
        )));
    }
    Ok(RestClient::new(url, config.credential())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_client_uses_configured_url() {
        let config = HarnessConfig::new().with_rest_url("http://cp:8081/");
        let client = rest_client(&config).unwrap();
        assert_eq!(client.base_url(), "http://cp:8081");
        assert_eq!(client.credential().qualified_user(), "system/admin");
    }

    #[test]
    fn test_rest_client_rejects_non_http_url() {
        let config = HarnessConfig::new().with_rest_url("cp:8081");
        let err = rest_client(&config).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert!(err.to_string().contains("'cp:8081'"));
    }
}
