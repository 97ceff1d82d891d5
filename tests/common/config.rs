//! Test configuration helpers for loading .env credentials and creating pullers

use super::fixtures::{TEST_COUNTER, TEST_TOKEN};
use logs_report_dl::{Account, Config, CounterId, DateRange, LogSource, ReportPuller, ReportQuery};
use std::time::Duration;

/// Error type for test configuration
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Load the live account from environment variables
///
/// Required environment variables:
/// - `LOGS_API_TOKEN` - OAuth token
/// - `LOGS_API_COUNTER` - Counter id
pub fn load_account() -> Result<Account, ConfigError> {
    dotenvy::dotenv().ok();

    let token = std::env::var("LOGS_API_TOKEN")
        .map_err(|_| ConfigError("LOGS_API_TOKEN not set in environment".to_string()))?;

    let counter = std::env::var("LOGS_API_COUNTER")
        .map_err(|_| ConfigError("LOGS_API_COUNTER not set in environment".to_string()))?;

    Ok(Account::new(token, CounterId::new(counter)))
}

/// Check if live credentials are available
pub fn has_live_credentials() -> bool {
    load_account().is_ok()
}

/// Configuration for live runs
///
/// Optional environment variables:
/// - `LOGS_API_HOST` - API base URL (default: the library default)
/// - `LOGS_API_POLL_SECS` - Delay between status polls (default: 10)
pub fn live_config() -> Config {
    dotenvy::dotenv().ok();

    let mut config = Config::default();
    if let Ok(host) = std::env::var("LOGS_API_HOST") {
        config.api_host = host;
    }
    config.poll_interval = Duration::from_secs(
        std::env::var("LOGS_API_POLL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10),
    );
    config
}

/// Create a puller against the live API for a single day of visits
pub fn create_live_puller(fields: &[&str], day: chrono::NaiveDate) -> Result<ReportPuller, ConfigError> {
    let account = load_account()?;
    let query = ReportQuery::new(
        LogSource::Visits,
        fields.iter().copied(),
        DateRange::new(day, day),
    );
    ReportPuller::new(&live_config(), account, query)
        .map_err(|e| ConfigError(format!("Failed to create puller: {}", e)))
}

/// Create a puller against a mock server
pub fn create_mock_puller(uri: &str, query: ReportQuery) -> ReportPuller {
    let config = Config {
        api_host: uri.to_string(),
        poll_interval: Duration::from_millis(5),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let account = Account::new(TEST_TOKEN, CounterId::new(TEST_COUNTER));
    ReportPuller::new(&config, account, query).expect("valid mock configuration")
}
