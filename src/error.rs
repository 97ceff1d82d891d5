//! Error types for logs-report-dl
//!
//! Every remote operation has its own variant so callers can tell which step
//! of a pull failed. Variants produced by a non-success HTTP response carry the
//! status code and the raw response body; the body is what retry patterns are
//! matched against (see [`crate::retry`]).

use crate::types::{RemoteStatus, RequestId};
use thiserror::Error;

/// Result type alias for logs-report-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for logs-report-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_host")
        key: Option<String>,
    },

    /// Capacity estimate request was rejected
    #[error("estimation failed (HTTP {status}): {body}")]
    Estimation {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Report creation was rejected
    #[error("report request failed (HTTP {status}): {body}")]
    Request {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The server gave up building the report
    ///
    /// Fatal for the whole pull; never retried.
    #[error("report {request_id}: processing failed")]
    ProcessingFailed {
        /// The job that failed
        request_id: RequestId,
    },

    /// The report disappeared (canceled or cleaned) before it could be downloaded
    #[error("report {request_id} was discarded by the server (status {status})")]
    ReportDiscarded {
        /// The job that was discarded
        request_id: RequestId,
        /// The terminal status the server reported
        status: RemoteStatus,
    },

    /// Status refresh was rejected
    #[error("status query for report {request_id} failed (HTTP {status}): {body}")]
    Status {
        /// The job being polled
        request_id: RequestId,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Part download was rejected
    #[error("download of report {request_id} part {part} failed (HTTP {status}): {body}")]
    Download {
        /// The job being downloaded
        request_id: RequestId,
        /// Zero-based part index
        part: u32,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Clean call was rejected
    ///
    /// Usually non-fatal: the data was already retrieved.
    #[error("deletion of report {request_id} failed (HTTP {status}): {body}")]
    Deletion {
        /// The job that could not be deleted
        request_id: RequestId,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Listing outstanding reports was rejected
    #[error("listing reports failed (HTTP {status}): {body}")]
    Listing {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Operation is not valid for the job's current state
    #[error("cannot {operation} report {request_id} in status {status}")]
    InvalidState {
        /// The job the operation was attempted on, if it has one
        request_id: String,
        /// The operation that was attempted (e.g., "download", "delete")
        operation: &'static str,
        /// The current local status
        status: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Raw response body for errors caused by a non-success HTTP response
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Error::Estimation { body, .. }
            | Error::Request { body, .. }
            | Error::Status { body, .. }
            | Error::Download { body, .. }
            | Error::Deletion { body, .. }
            | Error::Listing { body, .. } => Some(body),
            _ => None,
        }
    }

    /// HTTP status code for errors caused by a non-success HTTP response
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Estimation { status, .. }
            | Error::Request { status, .. }
            | Error::Status { status, .. }
            | Error::Download { status, .. }
            | Error::Deletion { status, .. }
            | Error::Listing { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the error must abort the whole pull without retrying
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ProcessingFailed { .. } | Error::ReportDiscarded { .. } | Error::Config { .. }
        )
    }
}
