//! Logical locators and the structural selectors they resolve to.
//!
//! A [`Locator`] is what test code names: a stable key plus a strategy.
//! Turning it into a [`Selector`] is a pure function, so the same locator
//! always produces the same query regardless of page state.

use std::fmt::{self, Write as _};
use std::time::Duration;

/// Default timeout for wait operations (15 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 15_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Attribute carrying the stable test identifier
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

// =============================================================================
// SELECTOR
// =============================================================================

/// Structural query handed to the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Element whose `data-testid` equals the key
    TestId(String),
    /// `input` element whose `name` equals the key
    InputName(String),
    /// Element whose DOM id equals the key
    DomId(String),
    /// Elements with the given tag name
    Tag(String),
}

impl Selector {
    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a tag selector
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Render as a CSS selector
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::TestId(id) => format!("[{TEST_ID_ATTRIBUTE}=\"{}\"]", escape_css_string(id)),
            Self::InputName(name) => format!("input[name=\"{}\"]", escape_css_string(name)),
            Self::DomId(id) => format!("[id=\"{}\"]", escape_css_string(id)),
            Self::Tag(tag) => tag.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestId(id) => write!(f, "{TEST_ID_ATTRIBUTE}={id}"),
            Self::InputName(name) => write!(f, "input[name={name}]"),
            Self::DomId(id) => write!(f, "id={id}"),
            Self::Tag(tag) => write!(f, "<{tag}>"),
        }
    }
}

/// Body of a double-quoted CSS string; control characters become hex
/// escapes and NUL becomes U+FFFD
fn escape_css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => out.push(char::REPLACEMENT_CHARACTER),
            '\u{1}'..='\u{1f}' | '\u{7f}' => {
                let _ = write!(out, "\\{:x} ", u32::from(c));
            }
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// LOCATOR
// =============================================================================

/// How a locator key is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// By `data-testid` attribute
    #[default]
    TestId,
    /// By form input `name`
    InputName,
    /// By DOM id
    DomId,
}

/// Logical element key plus its resolution strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    key: String,
    strategy: Strategy,
}

impl Locator {
    /// Locator by test identifier
    #[must_use]
    pub fn test_id(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            strategy: Strategy::TestId,
        }
    }

    /// Locator by form input name
    #[must_use]
    pub fn input_name(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            strategy: Strategy::InputName,
        }
    }

    /// Locator by DOM id
    #[must_use]
    pub fn dom_id(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            strategy: Strategy::DomId,
        }
    }

    /// Logical key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Resolution strategy
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Structural selector for this locator
    #[must_use]
    pub fn selector(&self) -> Selector {
        match self.strategy {
            Strategy::TestId => Selector::TestId(self.key.clone()),
            Strategy::InputName => Selector::InputName(self.key.clone()),
            Strategy::DomId => Selector::DomId(self.key.clone()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.selector().fmt(f)
    }
}

impl From<&str> for Locator {
    fn from(key: &str) -> Self {
        Self::test_id(key)
    }
}

impl From<String> for Locator {
    fn from(key: String) -> Self {
        Self::test_id(key)
    }
}

// =============================================================================
// WAIT CONDITION & OPTIONS
// =============================================================================

/// Condition a wait resolves on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WaitCondition {
    /// Attached and displayed
    #[default]
    Visible,
    /// Attached to the DOM, possibly hidden or off-screen
    Present,
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => f.write_str("visible"),
            Self::Present => f.write_str("present"),
        }
    }
}

/// Deadline and polling cadence for waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_rendering() {
            assert_eq!(
                Selector::test_id("login_button").to_css(),
                "[data-testid=\"login_button\"]"
            );
            assert_eq!(
                Selector::InputName("username".into()).to_css(),
                "input[name=\"username\"]"
            );
            assert_eq!(Selector::DomId("main".into()).to_css(), "[id=\"main\"]");
            assert_eq!(Selector::tag("th").to_css(), "th");
        }

        #[test]
        fn test_css_escapes_quotes() {
            assert_eq!(
                Selector::test_id("a\"b\\c").to_css(),
                "[data-testid=\"a\\\"b\\\\c\"]"
            );
        }

        #[test]
        fn test_css_escapes_control_characters() {
            assert_eq!(
                Selector::test_id("line\nbreak\ttab").to_css(),
                "[data-testid=\"line\\a break\\9 tab\"]"
            );
            assert_eq!(Selector::DomId("a\0b".into()).to_css(), "[id=\"a\u{fffd}b\"]");
        }

        #[test]
        fn test_field_path_names_are_quoted() {
            assert_eq!(
                Selector::InputName("accessRule.allow.0".into()).to_css(),
                "input[name=\"accessRule.allow.0\"]"
            );
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_resolution_is_pure() {
            let locator = Locator::test_id("banner-done");
            assert_eq!(locator.selector(), locator.selector());
            assert_eq!(locator.selector(), Selector::test_id("banner-done"));
        }

        #[test]
        fn test_strategies() {
            assert_eq!(
                Locator::input_name("password").selector(),
                Selector::InputName("password".into())
            );
            assert_eq!(
                Locator::dom_id("root").selector(),
                Selector::DomId("root".into())
            );
            assert_eq!(Locator::from("x").strategy(), Strategy::TestId);
        }

        #[test]
        fn test_display() {
            assert_eq!(Locator::test_id("a").to_string(), "data-testid=a");
            assert_eq!(Locator::input_name("n").to_string(), "input[name=n]");
        }
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = WaitOptions::default();
            assert_eq!(options.timeout(), Duration::from_secs(15));
            assert_eq!(options.poll_interval(), Duration::from_millis(50));
        }

        #[test]
        fn test_builder() {
            let options = WaitOptions::new().with_timeout(200).with_poll_interval(5);
            assert_eq!(options.timeout_ms, 200);
            assert_eq!(options.poll_interval_ms, 5);
        }
    }
}
