//! Classification of transient failures
//!
//! The logs API signals overload and gateway trouble only through the text of
//! an error response. This module recognizes those responses so that an outer
//! retry wrapper (owned by the caller) can re-run the operation that raised
//! them. Nothing in this crate retries on its own.
//!
//! # Example
//!
//! ```
//! use logs_report_dl::retry::{IsRetryable, RetryClassifier};
//! use logs_report_dl::Error;
//!
//! let classifier = RetryClassifier::default();
//! let err = Error::Request {
//!     status: 504,
//!     body: "<html>504 Gateway Time-out</html>".to_string(),
//! };
//! assert!(classifier.classify(&err));
//! assert!(err.is_retryable());
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Response-body patterns that mark a failure as transient
pub const DEFAULT_RETRY_PATTERNS: &[&str] = &[
    ".*504 Gateway Time-out.*",
    ".*Сервис временно недоступен",
    ".*failed",
];

static DEFAULT_CLASSIFIER: LazyLock<RetryClassifier> = LazyLock::new(RetryClassifier::default);

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (gateway timeouts, server busy) should return `true`.
/// Permanent failures (bad field list, failed report build) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Classification with the default patterns
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        DEFAULT_CLASSIFIER.classify(self)
    }
}

/// Compiled set of transient-failure patterns
#[derive(Clone, Debug)]
pub struct RetryClassifier {
    patterns: Vec<Regex>,
}

impl RetryClassifier {
    /// Compile a classifier from regex patterns
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the first pattern that does not compile
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| Error::Config {
                    message: format!("invalid retry pattern '{}': {}", p.as_ref(), e),
                    key: Some("retry_patterns".to_string()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Source text of the compiled patterns
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    /// True when any pattern occurs in the message
    pub fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(message))
    }

    /// Decide whether an error is worth retrying
    pub fn classify(&self, error: &Error) -> bool {
        match error {
            // The server has decided; asking again cannot change that
            Error::ProcessingFailed { .. } | Error::ReportDiscarded { .. } => false,
            Error::Config { .. } | Error::InvalidState { .. } | Error::Serialization(_) => false,
            Error::Network(e) => e.is_timeout() || e.is_connect() || self.matches(&e.to_string()),
            other => other.response_body().is_some_and(|body| self.matches(body)),
        }
    }
}

impl Default for RetryClassifier {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_RETRY_PATTERNS
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }
}
