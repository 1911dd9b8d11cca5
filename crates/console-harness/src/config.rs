//! Harness configuration.
//!
//! Resolved once per run from the environment and read-only afterwards.

use crate::locator::{WaitOptions, DEFAULT_WAIT_TIMEOUT_MS};
use crate::rest::AuthCredential;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// UI base URL variable
pub const ENV_UI_URL: &str = "CONSOLE_UI_URL";
/// REST base URL variable
pub const ENV_REST_URL: &str = "CONSOLE_REST_URL";
/// Bootstrap organization variable
pub const ENV_ADMIN_ORGANIZATION: &str = "CONSOLE_ADMIN_ORGANIZATION";
/// Bootstrap user variable
pub const ENV_ADMIN_USER: &str = "CONSOLE_ADMIN_USER";
/// Bootstrap password variable
pub const ENV_ADMIN_PASSWORD: &str = "CONSOLE_ADMIN_PASSWORD";
/// Open DevTools in each tab when `"true"`
pub const ENV_SHOW_DEVTOOLS: &str = "SHOW_CHROME_DEVTOOLS";
/// Remote DevTools websocket to attach to instead of launching
pub const ENV_BROWSER_WS_URL: &str = "BROWSER_WS_URL";
/// Local Chromium binary
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
/// Wait deadline in milliseconds
pub const ENV_WAIT_TIMEOUT_MS: &str = "CONSOLE_WAIT_TIMEOUT_MS";
/// Screenshot root directory
pub const ENV_RESULTS_DIR: &str = "CONSOLE_RESULTS_DIR";

/// Default UI base URL
pub const DEFAULT_UI_URL: &str = "http://selenium-tests-nginx-1";
/// Default REST base URL
pub const DEFAULT_REST_URL: &str = "http://localhost:8081";
/// Default bootstrap organization
pub const DEFAULT_ADMIN_ORGANIZATION: &str = "system";
/// Default bootstrap user
pub const DEFAULT_ADMIN_USER: &str = "admin";
/// Default bootstrap password
pub const DEFAULT_ADMIN_PASSWORD: &str = "passw0rd";
/// Default screenshot root
pub const DEFAULT_RESULTS_DIR: &str = "target/test-results";

/// Viewport used when maximizing a headless window
pub const MAXIMIZED_VIEWPORT: (u32, u32) = (1920, 1080);

/// Resolved harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// UI base URL
    pub ui_url: String,
    /// REST base URL
    pub rest_url: String,
    /// Bootstrap organization
    pub admin_organization: String,
    /// Bootstrap user
    pub admin_user: String,
    /// Bootstrap password
    pub admin_password: String,
    /// Open DevTools in each tab
    pub show_devtools: bool,
    /// Remote DevTools websocket URL
    pub browser_ws_url: Option<String>,
    /// Chromium binary
    pub chromium_path: Option<PathBuf>,
    /// Run the browser headless
    pub headless: bool,
    /// Wait deadline in milliseconds
    pub wait_timeout_ms: u64,
    /// Screenshot root
    pub results_dir: PathBuf,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            ui_url: DEFAULT_UI_URL.to_string(),
            rest_url: DEFAULT_REST_URL.to_string(),
            admin_organization: DEFAULT_ADMIN_ORGANIZATION.to_string(),
            admin_user: DEFAULT_ADMIN_USER.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            show_devtools: false,
            browser_ws_url: None,
            chromium_path: None,
            headless: true,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl HarnessConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve from process environment
    ///
    /// # Errors
    ///
    /// Returns error on a malformed numeric value
    pub fn from_env() -> HarnessResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary lookup; unset or empty keys keep defaults
    ///
    /// # Errors
    ///
    /// Returns error on a malformed numeric value
    pub fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(v) = get(ENV_UI_URL) {
            config.ui_url = v;
        }
        if let Some(v) = get(ENV_REST_URL) {
            config.rest_url = v;
        }
        if let Some(v) = get(ENV_ADMIN_ORGANIZATION) {
            config.admin_organization = v;
        }
        if let Some(v) = get(ENV_ADMIN_USER) {
            config.admin_user = v;
        }
        if let Some(v) = get(ENV_ADMIN_PASSWORD) {
            config.admin_password = v;
        }
        config.show_devtools = get(ENV_SHOW_DEVTOOLS).is_some_and(|v| v.trim() == "true");
        config.browser_ws_url = get(ENV_BROWSER_WS_URL);
        config.chromium_path = get(ENV_CHROMIUM_PATH).map(PathBuf::from);
        if let Some(v) = get(ENV_WAIT_TIMEOUT_MS) {
            config.wait_timeout_ms = v.trim().parse().map_err(|_| {
                HarnessError::config(format!("{ENV_WAIT_TIMEOUT_MS} must be milliseconds, got '{v}'"))
            })?;
        }
        if let Some(v) = get(ENV_RESULTS_DIR) {
            config.results_dir = PathBuf::from(v);
        }
        Ok(config)
    }

    /// Set UI base URL
    #[must_use]
    pub fn with_ui_url(mut self, url: impl Into<String>) -> Self {
        self.ui_url = url.into();
        self
    }

    /// Set REST base URL
    #[must_use]
    pub fn with_rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    /// Set bootstrap credential
    #[must_use]
    pub fn with_admin(
        mut self,
        organization: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.admin_organization = organization.into();
        self.admin_user = user.into();
        self.admin_password = password.into();
        self
    }

    /// Set wait deadline
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout_ms: u64) -> Self {
        self.wait_timeout_ms = timeout_ms;
        self
    }

    /// Set screenshot root
    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Bootstrap credential for REST calls
    #[must_use]
    pub fn credential(&self) -> AuthCredential {
        AuthCredential::new(
            &self.admin_organization,
            &self.admin_user,
            &self.admin_password,
        )
    }

    /// Wait options derived from the configured deadline
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new().with_timeout(self.wait_timeout_ms)
    }

    /// Absolute UI URL for a path; `None` means the console root `/ui/`
    #[must_use]
    pub fn ui_path(&self, path: Option<&str>) -> String {
        let base = self.ui_url.trim_end_matches('/');
        match path {
            None => format!("{base}/ui/"),
            Some(p) if p.starts_with("http://") || p.starts_with("https://") => p.to_string(),
            Some(p) if p.starts_with('/') => format!("{base}{p}"),
            Some(p) => format!("{base}/{p}"),
        }
    }
}
