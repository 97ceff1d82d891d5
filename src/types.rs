//! Core types for logs-report-dl

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Date format used by the logs API for `date1`/`date2`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identifier of a remote report job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl RequestId {
    /// Create a new RequestId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Counter (account) identifier the reports are requested for
///
/// Credentials files carry it either as a JSON number or a string, so both
/// deserialize into the same textual form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CounterId(String);

impl CounterId {
    /// Create a new CounterId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is blank
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<'de> Deserialize<'de> for CounterId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

impl std::fmt::Display for CounterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which log table a report is built from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// Session-level log
    #[default]
    Visits,
    /// Pageview/event-level log
    Hits,
}

impl LogSource {
    /// Wire name of the source
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Visits => "visits",
            LogSource::Hits => "hits",
        }
    }
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visits" => Ok(LogSource::Visits),
            "hits" => Ok(LogSource::Hits),
            other => Err(format!("unknown log source: {other}")),
        }
    }
}

/// Inclusive calendar date range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range
    pub start: NaiveDate,
    /// Last day of the range (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range from its first and last day
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Difference between end and start in days (0 for a single-day range)
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Number of calendar days the range covers
    pub fn len_days(&self) -> i64 {
        self.days() + 1
    }

    /// `date1` query value
    pub fn date1(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// `date2` query value
    pub fn date2(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.date1(), self.date2())
    }
}

/// Status of a report job as reported by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Accepted, not started yet
    Created,
    /// Being built
    Processing,
    /// Waiting for the server to retry building
    AwaitingRetry,
    /// Ready to download
    Processed,
    /// Building failed on the server
    ProcessingFailed,
    /// Canceled before completion
    Canceled,
    /// Removed by a clean call
    CleanedByUser,
    /// Removed by the server's retention policy
    CleanedAutomaticallyAsTooOld,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl RemoteStatus {
    /// Still being worked on by the server
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Created
                | RemoteStatus::Processing
                | RemoteStatus::AwaitingRetry
                | RemoteStatus::Unknown
        )
    }

    /// Gone without data: the job will never become downloadable
    pub fn is_discarded(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Canceled
                | RemoteStatus::CleanedByUser
                | RemoteStatus::CleanedAutomaticallyAsTooOld
        )
    }
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteStatus::Created => "created",
            RemoteStatus::Processing => "processing",
            RemoteStatus::AwaitingRetry => "awaiting_retry",
            RemoteStatus::Processed => "processed",
            RemoteStatus::ProcessingFailed => "processing_failed",
            RemoteStatus::Canceled => "canceled",
            RemoteStatus::CleanedByUser => "cleaned_by_user",
            RemoteStatus::CleanedAutomaticallyAsTooOld => "cleaned_automatically_as_too_old",
            RemoteStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One downloadable part of a processed report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequestPart {
    /// Zero-based part number
    pub part_number: u32,
    /// Part size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Server-side description of a report job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    /// Job identifier
    pub request_id: RequestId,
    /// Current status
    pub status: RemoteStatus,
    /// Downloadable parts (present once processed)
    #[serde(default)]
    pub parts: Vec<LogRequestPart>,
    /// Requested fields as echoed by the server
    #[serde(default)]
    pub fields: Vec<String>,
    /// First day as echoed by the server
    #[serde(default)]
    pub date1: Option<NaiveDate>,
    /// Last day as echoed by the server
    #[serde(default)]
    pub date2: Option<NaiveDate>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_counter_id_accepts_number_and_string() {
        let from_number: CounterId = serde_json::from_str("12345").unwrap();
        let from_string: CounterId = serde_json::from_str("\"12345\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "12345");
    }

    #[test]
    fn test_date_range_day_counts() {
        let range = DateRange::new(date("2024-01-01"), date("2024-01-10"));
        assert_eq!(range.days(), 9);
        assert_eq!(range.len_days(), 10);
        assert_eq!(range.date1(), "2024-01-01");
        assert_eq!(range.date2(), "2024-01-10");
        assert_eq!(range.to_string(), "2024-01-01..2024-01-10");
    }

    #[test]
    fn test_remote_status_deserializes_known_and_unknown() {
        let status: RemoteStatus = serde_json::from_str("\"processing_failed\"").unwrap();
        assert_eq!(status, RemoteStatus::ProcessingFailed);

        let status: RemoteStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(status, RemoteStatus::Unknown);
        assert!(status.is_pending());
    }

    #[test]
    fn test_remote_status_display_matches_wire_name() {
        for status in [
            RemoteStatus::Created,
            RemoteStatus::Processing,
            RemoteStatus::AwaitingRetry,
            RemoteStatus::Processed,
            RemoteStatus::ProcessingFailed,
            RemoteStatus::Canceled,
            RemoteStatus::CleanedByUser,
            RemoteStatus::CleanedAutomaticallyAsTooOld,
        ] {
            let wire = serde_json::to_string(&status).unwrap();
            assert_eq!(wire, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_log_request_parts_default_to_empty() {
        let req: LogRequest =
            serde_json::from_str(r#"{"request_id": 7, "status": "created"}"#).unwrap();
        assert_eq!(req.request_id, RequestId(7));
        assert!(req.parts.is_empty());
    }

    #[test]
    fn test_log_source_round_trips_through_str() {
        assert_eq!("hits".parse::<LogSource>().unwrap(), LogSource::Hits);
        assert_eq!(LogSource::Visits.to_string(), "visits");
        assert!("sessions".parse::<LogSource>().is_err());
    }
}
