//! # logs-report-dl
//!
//! Client library for pulling raw visit and hit logs from an asynchronous
//! report API.
//!
//! The server builds log reports in the background. Pulling a date span means:
//!
//! 1. asking whether the span fits in one report, and splitting it if not
//! 2. creating a report job per sub-range
//! 3. polling each job until it is processed
//! 4. downloading its parts as tab-separated text
//! 5. decoding the rows, folding repeated-group columns (goals) into lists
//! 6. deleting the job so it stops counting against the account quota
//!
//! ## Design Philosophy
//!
//! - **Lazy** - records are pulled as the consumer asks for them, one job at a time
//! - **Sensible defaults** - an empty JSON object is a complete [`Config`]
//! - **Library-first** - no CLI, no retry loop; callers decide what a
//!   transient failure means with [`IsRetryable`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use futures::TryStreamExt;
//! use logs_report_dl::{Account, Config, CounterId, DateRange, LogSource, ReportPuller, ReportQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let account = Account::new("AQAA...", CounterId::new("12345"));
//!     let query = ReportQuery::new(
//!         LogSource::Visits,
//!         ["ym:s:visitID", "ym:s:dateTime", "ym:s:goalsID", "ym:s:goalsDateTime"],
//!         DateRange::new(
//!             NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!             NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
//!         ),
//!     );
//!
//!     let puller = ReportPuller::new(&Config::default(), account, query)?;
//!
//!     // Collect whatever an interrupted earlier run left behind
//!     puller.sweep().await?;
//!
//!     let mut records = Box::pin(puller.records());
//!     while let Some(record) = records.try_next().await? {
//!         println!("{}", serde_json::to_string(&record)?);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client and the remote operation trait
pub mod client;
/// Configuration types
pub mod config;
/// Tab-separated part decoding
pub mod decoder;
/// Error types
pub mod error;
/// Date range planning
pub mod planner;
/// End-to-end record stream
pub mod puller;
/// Report job state machine
pub mod report;
/// Transient failure classification
pub mod retry;
/// Core types
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use client::{LogsApiClient, ReportApi};
pub use config::{Account, Config, Credentials, ReportQuery};
pub use decoder::{DecodedRecord, FieldValue, GroupEntry, PartRecords, RecordDecoder, Scalar};
pub use error::{Error, Result};
pub use planner::{CapacityEstimate, plan};
pub use puller::ReportPuller;
pub use report::{JobStatus, ReportJob, ReportRunner};
pub use retry::{IsRetryable, RetryClassifier};
pub use types::{CounterId, DateRange, LogRequest, LogSource, RemoteStatus, RequestId};
