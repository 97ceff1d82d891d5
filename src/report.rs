//! Lifecycle of a report job on the server
//!
//! ```text
//! new ──create──▶ created ──poll──▶ processing ──poll──▶ processed ──delete──▶ deleted
//!                    │                  │
//!                    └──────poll────────┴──▶ processing_failed   (fatal)
//! ```
//!
//! [`ReportRunner`] drives a [`ReportJob`] through these states against a
//! [`ReportApi`]. Polling uses a fixed delay and has no attempt limit: the only
//! ways out are `processed` and a failure reported by the server.

use crate::client::ReportApi;
use crate::config::sort_fields;
use crate::error::{Error, Result};
use crate::types::{DateRange, LogRequest, LogSource, RemoteStatus, RequestId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Local view of a job's status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Planned, not yet sent to the server
    New,
    /// Accepted by the server
    Created,
    /// Being built by the server
    Processing,
    /// The server failed to build it
    ProcessingFailed,
    /// Ready to download
    Processed,
    /// Server-side data released
    Deleted,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::New => "new",
            JobStatus::Created => "created",
            JobStatus::Processing => "processing",
            JobStatus::ProcessingFailed => "processing_failed",
            JobStatus::Processed => "processed",
            JobStatus::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One report request over a date range
///
/// A job has a request id exactly when its status is not [`JobStatus::New`]:
/// the id is attached by the same transition that leaves `New`.
#[derive(Clone, Debug)]
pub struct ReportJob {
    range: DateRange,
    fields: Vec<String>,
    status: JobStatus,
    request_id: Option<RequestId>,
    part_count: Option<u32>,
}

impl ReportJob {
    /// A planned job that has not been sent yet
    pub fn new(range: DateRange, fields: Vec<String>) -> Self {
        Self {
            range,
            fields,
            status: JobStatus::New,
            request_id: None,
            part_count: None,
        }
    }

    /// Date range the job covers
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Requested fields, in query order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Server-side id, once created
    pub fn request_id(&self) -> Option<RequestId> {
        self.request_id
    }

    /// Number of downloadable parts, once processed
    pub fn part_count(&self) -> Option<u32> {
        self.part_count
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            request_id: self
                .request_id
                .map_or_else(|| "<unsent>".to_string(), |id| id.to_string()),
            operation,
            status: self.status.to_string(),
        }
    }

    /// Fold a server response into the job
    fn apply(&mut self, remote: &LogRequest) -> Result<()> {
        self.request_id = Some(remote.request_id);
        match remote.status {
            RemoteStatus::Processed => {
                self.status = JobStatus::Processed;
                self.part_count = Some(u32::try_from(remote.parts.len()).unwrap_or(u32::MAX));
            }
            RemoteStatus::ProcessingFailed => {
                self.status = JobStatus::ProcessingFailed;
                return Err(Error::ProcessingFailed {
                    request_id: remote.request_id,
                });
            }
            status if status.is_discarded() => {
                return Err(Error::ReportDiscarded {
                    request_id: remote.request_id,
                    status,
                });
            }
            RemoteStatus::Created => self.status = JobStatus::Created,
            _ => self.status = JobStatus::Processing,
        }
        Ok(())
    }
}

/// Drives report jobs through their lifecycle
#[derive(Clone)]
pub struct ReportRunner {
    api: Arc<dyn ReportApi>,
    source: LogSource,
    poll_interval: Duration,
}

impl ReportRunner {
    /// Create a runner creating reports from `source`, polling every `poll_interval`
    pub fn new(api: Arc<dyn ReportApi>, source: LogSource, poll_interval: Duration) -> Self {
        Self {
            api,
            source,
            poll_interval,
        }
    }

    /// Send a new job to the server
    ///
    /// Fields are sent sorted case-insensitively so the column order of the
    /// resulting parts does not depend on how the query listed them.
    ///
    /// # Errors
    /// [`Error::InvalidState`] unless the job is new; [`Error::Request`] when
    /// the server rejects the creation
    pub async fn create(&self, job: &mut ReportJob) -> Result<()> {
        if job.status != JobStatus::New {
            return Err(job.invalid("create"));
        }

        let fields = sort_fields(&job.fields);
        let created = self.api.create(self.source, &fields, job.range).await?;
        job.apply(&created)?;

        info!(
            request_id = %created.request_id,
            range = %job.range,
            status = %job.status,
            "created report request"
        );
        Ok(())
    }

    /// Refresh the job's status from the server
    ///
    /// # Errors
    /// [`Error::ProcessingFailed`] when the server reports a failed build,
    /// [`Error::ReportDiscarded`] when the job was canceled or cleaned,
    /// [`Error::Status`] when the status call is rejected
    pub async fn poll(&self, job: &mut ReportJob) -> Result<JobStatus> {
        let request_id = match (job.status, job.request_id) {
            (JobStatus::Created | JobStatus::Processing | JobStatus::Processed, Some(id)) => id,
            _ => return Err(job.invalid("poll")),
        };

        let remote = self.api.status(request_id).await?;
        job.apply(&remote)?;
        Ok(job.status)
    }

    /// Poll with a fixed delay until the job is processed
    ///
    /// There is no attempt limit.
    pub async fn wait_until_processed(&self, job: &mut ReportJob) -> Result<()> {
        if job.status == JobStatus::New {
            return Err(job.invalid("wait for"));
        }

        let mut attempts: u64 = 0;
        while job.status != JobStatus::Processed {
            tokio::time::sleep(self.poll_interval).await;
            attempts += 1;
            let status = self.poll(job).await?;
            debug!(
                request_id = ?job.request_id,
                attempt = attempts,
                status = %status,
                "polled report request"
            );
        }

        info!(
            request_id = ?job.request_id,
            parts = job.part_count.unwrap_or(0),
            polls = attempts,
            "report request ready"
        );
        Ok(())
    }

    /// Download one part of a processed job
    ///
    /// # Errors
    /// [`Error::InvalidState`] unless the job is processed and `part` is below
    /// its part count; [`Error::Download`] when the server rejects the download
    pub async fn download(&self, job: &ReportJob, part: u32) -> Result<String> {
        match (job.status, job.request_id, job.part_count) {
            (JobStatus::Processed, Some(id), Some(count)) if part < count => {
                self.api.download_part(id, part).await
            }
            _ => Err(job.invalid("download")),
        }
    }

    /// Release the server-side data of a processed job
    ///
    /// # Errors
    /// [`Error::InvalidState`] unless the job is processed; [`Error::Deletion`]
    /// when the server rejects the clean call (the job stays processed)
    pub async fn delete(&self, job: &mut ReportJob) -> Result<()> {
        let request_id = match (job.status, job.request_id) {
            (JobStatus::Processed, Some(id)) => id,
            _ => return Err(job.invalid("delete")),
        };

        self.api.clean(request_id).await?;
        job.status = JobStatus::Deleted;
        info!(request_id = %request_id, "deleted report request");
        Ok(())
    }

    /// Delete every processed job on the server, whoever created it
    ///
    /// Returns the ids that were deleted. A job whose clean call fails is
    /// logged and left for the next sweep; the others are still deleted.
    /// Running it again without new jobs in between deletes nothing.
    ///
    /// # Errors
    /// [`Error::Listing`] when the server rejects the list call
    pub async fn sweep(&self) -> Result<Vec<RequestId>> {
        let processed: Vec<RequestId> = self
            .api
            .list()
            .await?
            .into_iter()
            .filter(|r| r.status == RemoteStatus::Processed)
            .map(|r| r.request_id)
            .collect();

        let mut deleted = Vec::with_capacity(processed.len());
        for request_id in processed {
            info!(request_id = %request_id, "cleaning leftover report request");
            match self.api.clean(request_id).await {
                Ok(()) => deleted.push(request_id),
                Err(e) => warn!(
                    request_id = %request_id,
                    error = %e,
                    "failed to clean leftover report request"
                ),
            }
        }

        Ok(deleted)
    }
}

impl std::fmt::Debug for ReportRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRunner")
            .field("source", &self.source)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
