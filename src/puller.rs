//! End-to-end pull: plan, create, wait, download, decode, delete
//!
//! [`ReportPuller::records`] is lazy. Nothing is sent to the server until the
//! stream is first polled, and each job is created only once every record of
//! the previous job has been handed out. A job is deleted after its last part
//! has been drained; a consumer that stops early leaves the current job on the
//! server, where [`ReportPuller::sweep`] can collect it later.

use crate::client::{LogsApiClient, ReportApi};
use crate::config::{Account, Config, ReportQuery};
use crate::decoder::{DecodedRecord, PartRecords};
use crate::error::{Error, Result};
use crate::planner;
use crate::report::{ReportJob, ReportRunner};
use crate::retry::RetryClassifier;
use crate::types::{CounterId, RequestId};
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

/// Pulls decoded log records for one query of one account
pub struct ReportPuller {
    api: Arc<dyn ReportApi>,
    runner: ReportRunner,
    query: ReportQuery,
    account_id: CounterId,
    groups: Vec<String>,
    unescape_quotes: bool,
    retry: RetryClassifier,
}

impl ReportPuller {
    /// Create a puller talking HTTP to the configured host
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the configuration or query is invalid
    pub fn new(config: &Config, account: Account, query: ReportQuery) -> Result<Self> {
        let account_id = account.counter_id().clone();
        let client = LogsApiClient::new(config, account)?;
        Self::with_api(Arc::new(client), config, account_id, query)
    }

    /// Create a puller on top of any [`ReportApi`] implementation
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the configuration or query is invalid
    pub fn with_api(
        api: Arc<dyn ReportApi>,
        config: &Config,
        account_id: CounterId,
        query: ReportQuery,
    ) -> Result<Self> {
        config.validate()?;
        query.validate()?;
        if account_id.is_empty() {
            return Err(Error::Config {
                message: "counter id must not be empty".to_string(),
                key: Some("counter_id".to_string()),
            });
        }

        Ok(Self {
            runner: ReportRunner::new(api.clone(), query.source, config.poll_interval),
            api,
            query,
            account_id,
            groups: config.groups.clone(),
            unescape_quotes: config.unescape_quotes,
            retry: config.retry_classifier()?,
        })
    }

    /// Counter the records are pulled from
    pub fn account_id(&self) -> &CounterId {
        &self.account_id
    }

    /// The query being pulled
    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    /// Response-body patterns that mark a failure as transient
    pub fn retry_patterns(&self) -> impl Iterator<Item = &str> {
        self.retry.patterns()
    }

    /// Classifier built from [`Self::retry_patterns`]
    pub fn retry_classifier(&self) -> &RetryClassifier {
        &self.retry
    }

    /// State machine used for each job
    pub fn runner(&self) -> &ReportRunner {
        &self.runner
    }

    /// Estimate the query and split it into unsent jobs
    ///
    /// # Errors
    /// Returns [`Error::Estimation`] when the evaluate call is rejected
    pub async fn plan_jobs(&self) -> Result<Vec<ReportJob>> {
        let ranges = planner::plan_ranges(self.api.as_ref(), &self.query).await?;
        Ok(ranges
            .into_iter()
            .map(|range| ReportJob::new(range, self.query.fields.clone()))
            .collect())
    }

    /// Delete every processed job left on the server for this counter
    ///
    /// A failed clean is logged and skipped; only the ids actually deleted
    /// are returned.
    pub async fn sweep(&self) -> Result<Vec<RequestId>> {
        let deleted = self.runner.sweep().await?;
        info!(
            counter_id = %self.account_id,
            deleted = deleted.len(),
            "swept processed report requests"
        );
        Ok(deleted)
    }

    /// Lazy stream of decoded records, in part order, job after job
    ///
    /// The stream ends after yielding its first error. A processing failure
    /// therefore stops the pull: no further job is created.
    pub fn records(&self) -> impl Stream<Item = Result<DecodedRecord>> + '_ {
        stream::try_unfold(PullState::new(self), |mut state| async move {
            let next = state.next_record().await?;
            Ok::<_, Error>(next.map(|record| (record, state)))
        })
    }

    /// Collect the whole stream
    pub async fn pull_all(&self) -> Result<Vec<DecodedRecord>> {
        self.records().try_collect().await
    }
}

impl std::fmt::Debug for ReportPuller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportPuller")
            .field("account_id", &self.account_id)
            .field("query", &self.query)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

/// A processed job whose parts are being handed out
struct ActiveJob {
    job: ReportJob,
    next_part: u32,
    records: Option<PartRecords>,
}

struct PullState<'a> {
    puller: &'a ReportPuller,
    /// `None` until the range has been planned
    pending: Option<VecDeque<ReportJob>>,
    active: Option<ActiveJob>,
}

impl<'a> PullState<'a> {
    fn new(puller: &'a ReportPuller) -> Self {
        Self {
            puller,
            pending: None,
            active: None,
        }
    }

    async fn next_record(&mut self) -> Result<Option<DecodedRecord>> {
        let puller = self.puller;

        if self.pending.is_none() {
            let jobs = puller.plan_jobs().await?;
            info!(
                counter_id = %puller.account_id,
                range = %puller.query.range,
                requests = jobs.len(),
                "downloading in {} request(s)",
                jobs.len()
            );
            self.pending = Some(jobs.into());
        }

        loop {
            if let Some(active) = self.active.as_mut() {
                if let Some(record) = active.records.as_mut().and_then(Iterator::next) {
                    return Ok(Some(record));
                }

                let part_count = active.job.part_count().unwrap_or(0);
                if active.next_part < part_count {
                    let part = active.next_part;
                    active.next_part += 1;
                    info!(
                        request_id = ?active.job.request_id(),
                        part = part + 1,
                        parts = part_count,
                        "downloading part"
                    );
                    let text = puller.runner.download(&active.job, part).await?;
                    active.records = Some(PartRecords::new(
                        text,
                        &puller.groups,
                        puller.unescape_quotes,
                    ));
                    continue;
                }

                if let Some(mut finished) = self.active.take() {
                    // The data is already out; a failed clean only leaves garbage behind
                    if let Err(e) = puller.runner.delete(&mut finished.job).await {
                        warn!(
                            request_id = ?finished.job.request_id(),
                            error = %e,
                            "failed to delete report request"
                        );
                    }
                }
                continue;
            }

            let Some(mut job) = self.pending.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };
            puller.runner.create(&mut job).await?;
            puller.runner.wait_until_processed(&mut job).await?;
            self.active = Some(ActiveJob {
                job,
                next_part: 0,
                records: None,
            });
        }
    }
}
