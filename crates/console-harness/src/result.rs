//! Result and error types for the console harness.
//!
//! Every failure a test can observe is one variant of [`HarnessError`].
//! [`ErrorKind`] is the flat discriminant used by retry predicates, so a
//! retry policy names the failure class it tolerates instead of matching on
//! message text.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Failure classes used by retry predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Locator did not resolve before the deadline
    NotFound,
    /// Element reference invalidated by a re-render
    Stale,
    /// Expected UI or REST state did not hold
    Assertion,
    /// REST call answered with a non-2xx status
    Http,
    /// REST endpoint refused or could not be reached
    Connect,
    /// Retry budget exhausted
    RetriesExhausted,
    /// Infrastructure failure (driver, IO, config, ...)
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotFound => "not-found",
            Self::Stale => "stale",
            Self::Assertion => "assertion",
            Self::Http => "http",
            Self::Connect => "connect",
            Self::RetriesExhausted => "retries-exhausted",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while driving the console under test
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Locator did not satisfy its wait condition in time
    #[error("Element {locator} not {condition} after {timeout_ms}ms")]
    NotFound {
        /// Rendered locator
        locator: String,
        /// Condition that was awaited
        condition: String,
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// Element handle no longer attached to the document
    #[error("Stale element reference: {detail}")]
    Stale {
        /// What went stale
        detail: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// REST call returned a non-2xx status
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Http {
        /// HTTP method
        method: String,
        /// Request URL
        url: String,
        /// Response status code
        status: u16,
        /// Response body (possibly empty)
        body: String,
    },

    /// REST endpoint could not be reached
    #[error("Unable to connect to {url}: {message}")]
    ConnectFailure {
        /// Request URL
        url: String,
        /// Error message
        message: String,
    },

    /// Retry budget exhausted; wraps the last failure
    #[error("Exhausted {attempts} retries: {last}")]
    RetriesExhausted {
        /// Number of retries performed after the first attempt
        attempts: u32,
        /// Failure from the final attempt
        last: Box<HarnessError>,
        /// Failures from every earlier attempt, oldest first
        suppressed: Vec<HarnessError>,
    },

    /// REST transport error other than a refused connection
    #[error("Transport error on {url}: {message}")]
    Transport {
        /// Request URL
        url: String,
        /// Error message
        message: String,
    },

    /// Browser driver error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch or connection error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Build an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Build a driver failure
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Build a stale-reference failure
    pub fn stale(detail: impl Into<String>) -> Self {
        Self::Stale {
            detail: detail.into(),
        }
    }

    /// Build a configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Failure class of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Stale { .. } => ErrorKind::Stale,
            Self::AssertionFailed { .. } => ErrorKind::Assertion,
            Self::Http { .. } => ErrorKind::Http,
            Self::ConnectFailure { .. } => ErrorKind::Connect,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::Transport { .. }
            | Self::Driver { .. }
            | Self::BrowserLaunch { .. }
            | Self::Config { .. }
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Other,
        }
    }

    /// True for stale element references
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// True when the REST endpoint was unreachable
    #[must_use]
    pub const fn is_connect_failure(&self) -> bool {
        matches!(self, Self::ConnectFailure { .. })
    }

    /// HTTP status, if this is an HTTP failure
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The failure from the last attempt when retries were exhausted,
    /// otherwise the error itself
    #[must_use]
    pub fn last_failure(&self) -> &Self {
        match self {
            Self::RetriesExhausted { last, .. } => last.last_failure(),
            other => other,
        }
    }

    /// Classify a `reqwest` failure for the given URL
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectFailure {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod kind_tests {
        use super::*;

        #[test]
        fn test_kinds_are_distinct_per_class() {
            assert_eq!(HarnessError::stale("row").kind(), ErrorKind::Stale);
            assert_eq!(HarnessError::assertion("x").kind(), ErrorKind::Assertion);
            assert_eq!(HarnessError::driver("x").kind(), ErrorKind::Other);
            let http = HarnessError::Http {
                method: "DELETE".into(),
                url: "http://h/users/x".into(),
                status: 404,
                body: String::new(),
            };
            assert_eq!(http.kind(), ErrorKind::Http);
            assert_eq!(http.http_status(), Some(404));
        }

        #[test]
        fn test_io_maps_to_other() {
            let err: HarnessError = std::io::Error::other("disk").into();
            assert_eq!(err.kind(), ErrorKind::Other);
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_not_found_message() {
            let err = HarnessError::NotFound {
                locator: "data-testid=login_button".into(),
                condition: "visible".into(),
                timeout_ms: 15_000,
            };
            assert_eq!(
                err.to_string(),
                "Element data-testid=login_button not visible after 15000ms"
            );
        }

        #[test]
        fn test_exhausted_message_includes_last() {
            let err = HarnessError::RetriesExhausted {
                attempts: 10,
                last: Box::new(HarnessError::assertion("boom")),
                suppressed: vec![],
            };
            assert!(err.to_string().starts_with("Exhausted 10 retries"));
            assert!(err.to_string().contains("boom"));
        }
    }

    mod last_failure_tests {
        use super::*;

        #[test]
        fn test_unwraps_nested_exhaustion() {
            let inner = HarnessError::RetriesExhausted {
                attempts: 2,
                last: Box::new(HarnessError::stale("cell")),
                suppressed: vec![],
            };
            let outer = HarnessError::RetriesExhausted {
                attempts: 3,
                last: Box::new(inner),
                suppressed: vec![],
            };
            assert!(outer.last_failure().is_stale());
        }

        #[test]
        fn test_plain_error_is_its_own_last_failure() {
            let err = HarnessError::assertion("x");
            assert_eq!(err.last_failure().kind(), ErrorKind::Assertion);
        }
    }
}
