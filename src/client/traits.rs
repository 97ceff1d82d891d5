//! Trait for the remote report operations

use crate::error::Result;
use crate::planner::CapacityEstimate;
use crate::types::{DateRange, LogRequest, LogSource, RequestId};
use async_trait::async_trait;

/// The six operations of the logs report protocol
///
/// Each method maps to one HTTP call. Implementations report a non-success
/// response with the error variant of the operation ([`crate::Error::Estimation`],
/// [`crate::Error::Request`], ...) carrying the raw response body, and never
/// retry on their own.
///
/// # Examples
///
/// ```no_run
/// use logs_report_dl::client::{LogsApiClient, ReportApi};
/// use logs_report_dl::config::{Account, Config};
/// use logs_report_dl::types::{CounterId, DateRange, LogSource};
/// use chrono::NaiveDate;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let account = Account::new("token", CounterId::new("12345"));
/// let client = LogsApiClient::new(&Config::default(), account)?;
///
/// let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let fields = vec!["ym:s:visitID".to_string()];
/// let estimate = client
///     .evaluate(LogSource::Visits, &fields, DateRange::new(day, day))
///     .await?;
/// println!("fits in one report: {}", estimate.possible);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// Ask whether `range` can be served by a single report
    async fn evaluate(
        &self,
        source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> Result<CapacityEstimate>;

    /// Create a report job; `fields` are sent in the given order
    async fn create(
        &self,
        source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> Result<LogRequest>;

    /// Fetch the current state of a report job
    async fn status(&self, request_id: RequestId) -> Result<LogRequest>;

    /// Download one part of a processed report as raw tab-separated text
    async fn download_part(&self, request_id: RequestId, part: u32) -> Result<String>;

    /// Release the server-side data of a report job
    async fn clean(&self, request_id: RequestId) -> Result<()>;

    /// List every report job known for the counter
    async fn list(&self) -> Result<Vec<LogRequest>>;
}
