//! Configuration types for logs-report-dl
//!
//! Three inputs describe a pull:
//! - [`Config`]: tunables with sensible defaults (host, poll interval, decoding)
//! - [`Account`]: who is asking, resolved once from [`Credentials`] plus an optional override
//! - [`ReportQuery`]: what is asked for (source, fields, date range)

use crate::error::{Error, Result};
use crate::retry::{DEFAULT_RETRY_PATTERNS, RetryClassifier};
use crate::types::{CounterId, DateRange, LogSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration
///
/// Every field has a default, so an empty JSON object deserializes to
/// [`Config::default()`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the API (default: "https://api-metrika.yandex.ru")
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// Timeout for a single HTTP call (default: 300 seconds)
    ///
    /// Part downloads can be large, so this is generous.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Fixed delay between two status polls (default: 20 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Field-name prefixes decoded as repeated groups (default: ["goals"])
    #[serde(default = "default_groups")]
    pub groups: Vec<String>,

    /// Response-body patterns that mark a failure as transient
    #[serde(default = "default_retry_patterns")]
    pub retry_patterns: Vec<String>,

    /// Replace `\'` with `'` in downloaded parts before decoding (default: true)
    ///
    /// Works around the server escaping single quotes inside list values.
    #[serde(default = "default_true")]
    pub unescape_quotes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            request_timeout: default_request_timeout(),
            poll_interval: default_poll_interval(),
            groups: default_groups(),
            retry_patterns: default_retry_patterns(),
            unescape_quotes: true,
        }
    }
}

impl Config {
    /// Check the configuration before any request is made
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key
    pub fn validate(&self) -> Result<()> {
        let host = url::Url::parse(&self.api_host).map_err(|e| Error::Config {
            message: format!("invalid API host '{}': {}", self.api_host, e),
            key: Some("api_host".to_string()),
        })?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("API host must be http(s), got '{}'", host.scheme()),
                key: Some("api_host".to_string()),
            });
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("poll_interval".to_string()),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("request_timeout".to_string()),
            });
        }

        if self.groups.iter().any(|g| g.trim().is_empty()) {
            return Err(Error::Config {
                message: "group prefixes must not be blank".to_string(),
                key: Some("groups".to_string()),
            });
        }

        RetryClassifier::new(&self.retry_patterns)?;
        Ok(())
    }

    /// Compile the configured retry patterns
    pub fn retry_classifier(&self) -> Result<RetryClassifier> {
        RetryClassifier::new(&self.retry_patterns)
    }
}

/// Contents of a credentials file
///
/// Reading the file is left to the caller; this type only fixes its shape:
///
/// ```json
/// { "token": "AQAA...", "counterId": 12345 }
/// ```
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// OAuth token
    pub token: String,

    /// Default counter, used when no explicit counter is requested
    #[serde(default, rename = "counterId")]
    pub counter_id: Option<CounterId>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("counter_id", &self.counter_id)
            .finish()
    }
}

/// Resolved identity a pull runs as
#[derive(Clone)]
pub struct Account {
    token: String,
    counter_id: CounterId,
}

impl Account {
    /// Build an account from explicit values
    pub fn new(token: impl Into<String>, counter_id: CounterId) -> Self {
        Self {
            token: token.into(),
            counter_id,
        }
    }

    /// Resolve the account once: an explicit, non-blank counter id wins over
    /// the credentials default
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the token is blank or neither source
    /// names a counter
    pub fn resolve(credentials: &Credentials, explicit_counter: Option<CounterId>) -> Result<Self> {
        if credentials.token.trim().is_empty() {
            return Err(Error::Config {
                message: "credentials contain an empty token".to_string(),
                key: Some("token".to_string()),
            });
        }

        let counter_id = explicit_counter
            .filter(|id| !id.is_empty())
            .or_else(|| credentials.counter_id.clone().filter(|id| !id.is_empty()))
            .ok_or_else(|| Error::Config {
                message: "no counter id given and none in credentials".to_string(),
                key: Some("counterId".to_string()),
            })?;

        Ok(Self {
            token: credentials.token.clone(),
            counter_id,
        })
    }

    /// The counter reports are requested for
    pub fn counter_id(&self) -> &CounterId {
        &self.counter_id
    }

    /// Value of the `Authorization` header
    pub(crate) fn authorization(&self) -> String {
        format!("OAuth {}", self.token)
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("token", &"<redacted>")
            .field("counter_id", &self.counter_id)
            .finish()
    }
}

/// What a pull asks the server for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    /// Log table to read
    #[serde(default)]
    pub source: LogSource,
    /// Requested fields, in request order, without duplicates
    pub fields: Vec<String>,
    /// Overall date span
    pub range: DateRange,
}

impl ReportQuery {
    /// Build a query, dropping repeated field names while keeping first occurrences in order
    pub fn new<I, S>(source: LogSource, fields: I, range: DateRange) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self {
            source,
            fields: unique,
            range,
        }
    }

    /// Check the query before any request is made
    ///
    /// # Errors
    /// Returns [`Error::Config`] for an empty or blank field list, or a range
    /// that ends before it starts
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::Config {
                message: "at least one field must be requested".to_string(),
                key: Some("fields".to_string()),
            });
        }
        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(Error::Config {
                message: "field names must not be blank".to_string(),
                key: Some("fields".to_string()),
            });
        }
        if self.range.end < self.range.start {
            return Err(Error::Config {
                message: format!("date range {} ends before it starts", self.range),
                key: Some("range".to_string()),
            });
        }
        Ok(())
    }

    /// Fields sorted case-insensitively, the order reports are created with
    pub fn sorted_fields(&self) -> Vec<String> {
        sort_fields(&self.fields)
    }
}

/// Sort field names case-insensitively
pub(crate) fn sort_fields(fields: &[String]) -> Vec<String> {
    let mut sorted = fields.to_vec();
    sorted.sort_by_key(|f| f.to_lowercase());
    sorted
}

fn default_api_host() -> String {
    "https://api-metrika.yandex.ru".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(20)
}

fn default_groups() -> Vec<String> {
    vec!["goals".to_string()]
}

fn default_retry_patterns() -> Vec<String> {
    DEFAULT_RETRY_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
