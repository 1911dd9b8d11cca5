//! console-harness: end-to-end test harness for the database console
//!
//! Drives the console's web UI through a browser while provisioning and
//! cleaning up backend resources over its REST API.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                      console-harness                              │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  TestCase ──► scenario helpers ──► Waiter ──► UiDriver ──► Chromium│
//! │     │               │                │                    (CDP)    │
//! │     │               └──► query_table ┘                             │
//! │     └──► ResourceTracker ──► RestClient ──► console REST API       │
//! │                   retry / retry_on_stale wrap any of the above     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```ignore
//! # use console_harness::{HarnessConfig, Outcome, RestClient, Session, TestCase};
//! # async fn demo() -> console_harness::HarnessResult<()> {
//! let config = HarnessConfig::from_env()?;
//! let rest = RestClient::new(&config.rest_url, config.credential())?;
//! let session = Session::launch(config).await?;
//!
//! let mut case = TestCase::begin(&session, &rest, console_harness::test_name!("create_project")).await?;
//! let result = async {
//!     case.login_admin().await?;
//!     case.create_project().await
//! }
//! .await;
//! case.finish(Outcome::of(&result)).await;
//! session.close().await
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod artifacts;
pub mod assertion;
pub mod browser;
pub mod config;
pub mod driver;
pub mod locator;
pub mod logging;
pub mod mock;
pub mod resource;
pub mod rest;
pub mod result;
pub mod retry;
pub mod scenario;
pub mod session;
pub mod table;
pub mod wait;

pub use artifacts::{save_screenshot, Outcome, TestName};
pub use assertion::{assert_elements, expect_eq, expect_len, expect_true, ElementAssert, ElementsAssert};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use config::HarnessConfig;
pub use driver::{ElementHandle, UiDriver};
pub use locator::{Locator, Selector, Strategy, WaitCondition, WaitOptions};
pub use logging::init_test_tracing;
pub use mock::{MockDriver, MockElement};
pub use resource::{
    CleanupStrategy, ResourceBackend, ResourceKind, ResourceRecord, ResourceTracker,
    TeardownReport, TEARDOWN_ORDER,
};
pub use rest::{AuthCredential, RestClient};
pub use result::{ErrorKind, HarnessError, HarnessResult};
pub use retry::{
    retry, retry_default, retry_if, retry_on_stale, retry_with, retry_with_outcome, RetryOn,
    RetryOutcome, RetrySpec,
};
pub use scenario::{short_unique, short_unique_at};
pub use session::{Session, TestCase};
pub use table::{query_table, read_table, ColumnRef, TableSnapshot};
pub use wait::Waiter;

/// Prelude for test files
pub mod prelude {
    pub use super::{
        expect_eq, expect_true, query_table, retry, retry_on_stale, ColumnRef, HarnessConfig,
        HarnessError, HarnessResult, Locator, Outcome, ResourceKind, RestClient, RetrySpec,
        Session, TestCase, UiDriver, WaitCondition, Waiter,
    };
}
