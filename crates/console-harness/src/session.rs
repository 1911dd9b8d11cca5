//! Browser session and per-test lifecycle.
//!
//! A [`Session`] owns the single driver for a suite run. It is created once,
//! used by one test at a time, and closed once. Tests run strictly
//! sequentially against it; nothing here is meant for concurrent use.
//!
//! A [`TestCase`] is one running test. It resets the page on start, owns
//! the test's [`ResourceTracker`], and on finish saves the outcome
//! screenshot and tears down whatever the test left behind.

use crate::artifacts::{save_screenshot, Outcome, TestName};
use crate::config::HarnessConfig;
use crate::driver::UiDriver;
use crate::resource::{CleanupStrategy, ResourceTracker, TeardownReport};
use crate::rest::RestClient;
use crate::result::HarnessResult;
use crate::wait::Waiter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The suite's browser session
pub struct Session {
    driver: Box<dyn UiDriver>,
    config: HarnessConfig,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap an existing driver
    #[must_use]
    pub fn with_driver(driver: impl UiDriver + 'static, config: HarnessConfig) -> Self {
        Self {
            driver: Box::new(driver),
            config,
        }
    }

    /// Launch Chromium (or attach to `browser_ws_url`) per the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched or reached
    #[cfg(feature = "browser")]
    pub async fn launch(config: HarnessConfig) -> HarnessResult<Self> {
        let driver = crate::browser::ChromiumDriver::start(&config).await?;
        Ok(Self::with_driver(driver, config))
    }

    /// The driver
    #[must_use]
    pub fn driver(&self) -> &dyn UiDriver {
        self.driver.as_ref()
    }

    /// Resolved configuration
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Wait engine using the configured deadline
    #[must_use]
    pub fn waiter(&self) -> Waiter<'_> {
        Waiter::with_options(self.driver(), self.config.wait_options())
    }

    /// Navigate; relative paths resolve against the UI base, `None` is `/ui/`
    pub async fn get(&self, path: Option<&str>) -> HarnessResult<()> {
        self.driver.navigate(&self.config.ui_path(path)).await
    }

    /// Document title
    pub async fn title(&self) -> HarnessResult<String> {
        self.driver.title().await
    }

    /// Resize the viewport
    pub async fn set_window_size(&self, width: u32, height: u32) -> HarnessResult<()> {
        self.driver.set_window_size(width, height).await
    }

    /// Save a screenshot to `path`
    pub async fn save_screenshot(&self, path: &Path) -> HarnessResult<()> {
        save_screenshot(self.driver(), path).await
    }

    /// Per-test reset: console root, empty `localStorage`, maximized window
    pub async fn begin_test(&self) -> HarnessResult<()> {
        self.get(None).await?;
        self.driver.execute_script("localStorage.clear();").await?;
        self.driver.maximize().await
    }

    /// Close the browser
    pub async fn close(self) -> HarnessResult<()> {
        self.driver.close().await
    }
}

/// One running test
#[derive(Debug)]
pub struct TestCase<'a> {
    session: &'a Session,
    rest: &'a RestClient,
    tracker: ResourceTracker,
    name: TestName,
}

impl<'a> TestCase<'a> {
    /// Reset the page and start tracking resources.
    ///
    /// Cleanup defaults to relisting the backend and deleting everything
    /// except the REST client's own user.
    pub async fn begin(
        session: &'a Session,
        rest: &'a RestClient,
        name: TestName,
    ) -> HarnessResult<Self> {
        session.begin_test().await?;
        info!(test = %name, "test started");
        let strategy = CleanupStrategy::relist(rest.credential().qualified_user());
        Ok(Self {
            session,
            rest,
            tracker: ResourceTracker::new(strategy),
            name,
        })
    }

    /// Replace the cleanup strategy
    #[must_use]
    pub fn with_cleanup(mut self, strategy: CleanupStrategy) -> Self {
        let mut tracker = ResourceTracker::new(strategy);
        for record in self.tracker.pending() {
            tracker.record_creation(record.kind, record.name);
        }
        self.tracker = tracker;
        self
    }

    /// Session in use
    #[must_use]
    pub const fn session(&self) -> &'a Session {
        self.session
    }

    /// REST client in use
    #[must_use]
    pub const fn rest(&self) -> &'a RestClient {
        self.rest
    }

    /// Wait engine
    #[must_use]
    pub fn waiter(&self) -> Waiter<'a> {
        self.session.waiter()
    }

    /// Test identity
    #[must_use]
    pub const fn name(&self) -> &TestName {
        &self.name
    }

    /// Tracked resources
    #[must_use]
    pub const fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Tracked resources, mutable
    pub fn tracker_mut(&mut self) -> &mut ResourceTracker {
        &mut self.tracker
    }

    /// Screenshot path for an outcome
    #[must_use]
    pub fn screenshot_path(&self, outcome: Outcome) -> PathBuf {
        self.name
            .screenshot_path(&self.session.config().results_dir, outcome)
    }

    /// Save the outcome screenshot, then tear down tracked resources.
    ///
    /// Neither step can fail the test; problems are logged and the teardown
    /// report is returned.
    pub async fn finish(mut self, outcome: Outcome) -> TeardownReport {
        let path = self.screenshot_path(outcome);
        match self.session.save_screenshot(&path).await {
            Ok(()) => info!(test = %self.name, %outcome, path = %path.display(), "test finished"),
            Err(err) => warn!(test = %self.name, %outcome, error = %err, "screenshot failed"),
        }
        let report = self.tracker.teardown_all(self.rest).await;
        if !report.is_clean() {
            warn!(
                test = %self.name,
                failures = report.failures.len(),
                listing_failures = report.listing_failures.len(),
                "teardown incomplete"
            );
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockAction, MockDriver};
    use crate::resource::ResourceKind;
    use crate::rest::AuthCredential;
    use crate::retry::RetrySpec;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(results: &Path) -> (Session, Arc<MockDriver>) {
        let driver = Arc::new(MockDriver::new());
        let config = HarnessConfig::new()
            .with_ui_url("http://console")
            .with_results_dir(results);
        (Session::with_driver(Arc::clone(&driver), config), driver)
    }

    fn unreachable_rest() -> RestClient {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        RestClient::new(
            format!("http://127.0.0.1:{port}"),
            AuthCredential::new("system", "admin", "pw"),
        )
        .unwrap()
        .with_connect_retry(RetrySpec::new(0, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_begin_resets_page() {
        let dir = tempfile::tempdir().unwrap();
        let (session, driver) = session(dir.path());
        session.begin_test().await.unwrap();
        assert_eq!(
            driver.actions(),
            vec![
                MockAction::Navigate("http://console/ui/".into()),
                MockAction::Script("localStorage.clear();".into()),
                MockAction::Maximize,
            ]
        );
    }

    #[tokio::test]
    async fn test_finish_saves_screenshot_and_reports_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _driver) = session(dir.path());
        let rest = unreachable_rest();
        let name = TestName {
            module_path: "suite::projects".into(),
            method: "creates".into(),
            line: 7,
        };
        let mut case = TestCase::begin(&session, &rest, name).await.unwrap();
        case.tracker_mut()
            .record_creation(ResourceKind::Projects, "acme/p1");

        let report = case.finish(Outcome::Failed).await;
        assert!(dir.path().join("suite/projects/creates:7-FAILED.png").exists());
        // listing and deletion both fail against a closed port, but teardown
        // still attempts the recorded project
        assert_eq!(report.listing_failures.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record.name, "acme/p1");
    }

    #[tokio::test]
    async fn test_get_resolves_against_ui_url() {
        let dir = tempfile::tempdir().unwrap();
        let (session, driver) = session(dir.path());
        driver.set_title("Console");

        session.get(Some("databases")).await.unwrap();
        assert_eq!(driver.current_url(), "http://console/databases");
        session.get(None).await.unwrap();
        assert_eq!(driver.current_url(), "http://console/ui/");
        assert_eq!(session.title().await.unwrap(), "Console");
    }

    #[tokio::test]
    async fn test_close_closes_driver() {
        let dir = tempfile::tempdir().unwrap();
        let (session, driver) = session(dir.path());
        session.close().await.unwrap();
        assert_eq!(driver.actions(), vec![MockAction::Close]);
    }
}
