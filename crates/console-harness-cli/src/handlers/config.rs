//! Config command handler

use crate::error::CliResult;
use crate::output::{yes_no, Printer};
use crate::ConfigArgs;
use console_harness::HarnessConfig;
use serde::Serialize;
use std::path::Path;

/// Shown in place of the bootstrap password
pub const PASSWORD_MASK: &str = "***";

/// Printable configuration with the password masked
#[derive(Debug, Serialize)]
pub struct ConfigView<'a> {
    /// UI base URL
    pub ui_url: &'a str,
    /// REST base URL
    pub rest_url: &'a str,
    /// Bootstrap organization
    pub admin_organization: &'a str,
    /// Bootstrap user
    pub admin_user: &'a str,
    /// Always [`PASSWORD_MASK`]
    pub admin_password: &'static str,
    /// Devtools shown on launch
    pub show_devtools: bool,
    /// Headless browser
    pub headless: bool,
    /// Remote browser endpoint
    pub browser_ws_url: Option<&'a str>,
    /// Local browser executable
    pub chromium_path: Option<&'a Path>,
    /// Element wait deadline
    pub wait_timeout_ms: u64,
    /// Screenshot root
    pub results_dir: &'a Path,
}

impl<'a> From<&'a HarnessConfig> for ConfigView<'a> {
    fn from(config: &'a HarnessConfig) -> Self {
        Self {
            ui_url: &config.ui_url,
            rest_url: &config.rest_url,
            admin_organization: &config.admin_organization,
            admin_user: &config.admin_user,
            admin_password: PASSWORD_MASK,
            show_devtools: config.show_devtools,
            headless: config.headless,
            browser_ws_url: config.browser_ws_url.as_deref(),
            chromium_path: config.chromium_path.as_deref(),
            wait_timeout_ms: config.wait_timeout_ms,
            results_dir: &config.results_dir,
        }
    }
}

/// Execute the config command
///
/// # Errors
///
/// Returns error if JSON serialization fails
pub fn execute_config(printer: &Printer, config: &HarnessConfig, args: &ConfigArgs) -> CliResult<()> {
    let view = ConfigView::from(config);
    if args.json {
        printer.data(&serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    printer.header("Resolved configuration:");
    for (key, value) in config_lines(&view) {
        printer.data(&format!("  {key:<20} {value}"));
    }
    Ok(())
}

/// Key/value lines for the plain-text listing
#[must_use]
pub fn config_lines(view: &ConfigView<'_>) -> Vec<(&'static str, String)> {
    vec![
        ("UI URL", view.ui_url.to_string()),
        ("REST URL", view.rest_url.to_string()),
        ("Organization", view.admin_organization.to_string()),
        ("User", view.admin_user.to_string()),
        ("Password", view.admin_password.to_string()),
        ("Show devtools", yes_no(view.show_devtools).to_string()),
        ("Headless", yes_no(view.headless).to_string()),
        (
            "Browser endpoint",
            view.browser_ws_url.unwrap_or("(launch)").to_string(),
        ),
        (
            "Chromium path",
            view.chromium_path
                .map_or_else(|| "(auto)".to_string(), |p| p.display().to_string()),
        ),
        ("Wait timeout", format!("{}ms", view.wait_timeout_ms)),
        ("Results dir", view.results_dir.display().to_string()),
    ]
}
