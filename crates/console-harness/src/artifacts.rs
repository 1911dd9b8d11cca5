//! Test identity and screenshot artifacts.
//!
//! Each finished test leaves one screenshot at a path derived from the test's
//! module path, name and source line:
//!
//! ```text
//! {results_dir}/{module/path}/{test_name}:{line}-{SUCCESS|FAILED}.png
//! ```

use crate::driver::UiDriver;
use crate::result::HarnessResult;
use std::fmt;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// How a test ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Test passed
    Success,
    /// Test failed
    Failed,
}

impl Outcome {
    /// Outcome of a test body's result
    #[must_use]
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Self::Success
        } else {
            Self::Failed
        }
    }

    /// File stem suffix
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a running test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestName {
    /// Rust module path of the test (`crate::module::tests`)
    pub module_path: String,
    /// Test function name
    pub method: String,
    /// Source line where the name was captured
    pub line: u32,
}

impl TestName {
    /// Capture a test name, recording the caller's line
    #[must_use]
    #[track_caller]
    pub fn new(module_path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            method: method.into(),
            line: Location::caller().line(),
        }
    }

    /// Screenshot path for this test under `results_dir`
    #[must_use]
    pub fn screenshot_path(&self, results_dir: &Path, outcome: Outcome) -> PathBuf {
        let mut path = results_dir.to_path_buf();
        for segment in self.module_path.split("::").filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}:{}-{}.png", self.method, self.line, outcome));
        path
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module_path, self.method)
    }
}

/// Name the current test from inside its body
///
/// ```
/// let name = console_harness::test_name!("creates_project");
/// assert_eq!(name.method, "creates_project");
/// ```
#[macro_export]
macro_rules! test_name {
    ($method:expr) => {
        $crate::TestName::new(module_path!(), $method)
    };
}

/// Capture a screenshot and write it to `path`, creating parent directories
pub async fn save_screenshot(driver: &dyn UiDriver, path: &Path) -> HarnessResult<()> {
    let png = driver.screenshot().await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, png).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MOCK_PNG};

    #[test]
    fn test_path_layout() {
        let name = TestName {
            module_path: "console_tests::basic::project_test".into(),
            method: "create_and_delete".into(),
            line: 42,
        };
        let path = name.screenshot_path(Path::new("target/test-results"), Outcome::Failed);
        assert_eq!(
            path,
            PathBuf::from("target/test-results/console_tests/basic/project_test/create_and_delete:42-FAILED.png")
        );
    }

    #[test]
    fn test_caller_line_is_captured() {
        let expected = line!() + 1;
        let name = TestName::new(module_path!(), "x");
        assert_eq!(name.line, expected);
    }

    #[test]
    fn test_outcome_of_result() {
        assert_eq!(Outcome::of(&Ok::<(), ()>(())), Outcome::Success);
        assert_eq!(Outcome::of(&Err::<(), ()>(())), Outcome::Failed);
    }

    #[tokio::test]
    async fn test_save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let path = dir.path().join("a/b/t:1-SUCCESS.png");
        save_screenshot(&driver, &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), MOCK_PNG);
    }
}
