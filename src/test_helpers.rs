//! Shared test helpers: an in-memory, scripted [`ReportApi`].
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::client::ReportApi;
use crate::error::{Error, Result};
use crate::planner::CapacityEstimate;
use crate::types::{DateRange, LogRequest, LogRequestPart, LogSource, RemoteStatus, RequestId};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub(crate) fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, crate::types::DATE_FORMAT).unwrap()
}

pub(crate) fn january() -> DateRange {
    DateRange::new(date("2024-01-01"), date("2024-01-31"))
}

/// One call received by [`FakeApi`], in order of arrival
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Evaluate(DateRange, Vec<String>),
    Create(DateRange, Vec<String>),
    Status(RequestId),
    Download(RequestId, u32),
    Clean(RequestId),
    List,
}

type PartsFn = Box<dyn Fn(DateRange) -> Vec<String> + Send + Sync>;

struct FakeJob {
    range: Option<DateRange>,
    status: RemoteStatus,
    script: VecDeque<RemoteStatus>,
    parts: Vec<String>,
}

struct FakeState {
    estimate: CapacityEstimate,
    script: Vec<RemoteStatus>,
    parts: PartsFn,
    jobs: BTreeMap<RequestId, FakeJob>,
    next_id: i64,
    calls: Vec<Call>,
    evaluate_error: Option<(u16, String)>,
    create_error: Option<(u16, String)>,
    download_error: Option<(u16, String)>,
    clean_error: Option<(u16, String)>,
    clean_failures: BTreeMap<RequestId, (u16, String)>,
    list_error: Option<(u16, String)>,
}

/// Report server double
///
/// Every created job walks through the status script, one entry per status
/// call, and stays on the last entry. Processed jobs expose the parts produced
/// by the parts function for their range.
pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    /// Feasible estimate, jobs processed on the first poll, one header-only part
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                estimate: CapacityEstimate {
                    possible: true,
                    max_possible_day_quantity: 0,
                },
                script: vec![RemoteStatus::Processed],
                parts: Box::new(|_| vec!["ym:s:visitID\n".to_string()]),
                jobs: BTreeMap::new(),
                next_id: 1000,
                calls: Vec::new(),
                evaluate_error: None,
                create_error: None,
                download_error: None,
                clean_error: None,
                clean_failures: BTreeMap::new(),
                list_error: None,
            }),
        }
    }

    pub(crate) fn set_estimate(&self, possible: bool, max_days: u32) {
        self.state.lock().unwrap().estimate = CapacityEstimate {
            possible,
            max_possible_day_quantity: max_days,
        };
    }

    pub(crate) fn script_statuses(&self, statuses: impl IntoIterator<Item = RemoteStatus>) {
        self.state.lock().unwrap().script = statuses.into_iter().collect();
    }

    pub(crate) fn set_parts(&self, parts: impl Fn(DateRange) -> Vec<String> + Send + Sync + 'static) {
        self.state.lock().unwrap().parts = Box::new(parts);
    }

    pub(crate) fn fail_evaluate(&self, status: u16, body: &str) {
        self.state.lock().unwrap().evaluate_error = Some((status, body.to_string()));
    }

    pub(crate) fn fail_create(&self, status: u16, body: &str) {
        self.state.lock().unwrap().create_error = Some((status, body.to_string()));
    }

    pub(crate) fn fail_download(&self, status: u16, body: &str) {
        self.state.lock().unwrap().download_error = Some((status, body.to_string()));
    }

    pub(crate) fn fail_clean(&self, status: u16, body: &str) {
        self.state.lock().unwrap().clean_error = Some((status, body.to_string()));
    }

    /// Fail the clean call of one job only
    pub(crate) fn fail_clean_for(&self, request_id: RequestId, status: u16, body: &str) {
        self.state
            .lock()
            .unwrap()
            .clean_failures
            .insert(request_id, (status, body.to_string()));
    }

    pub(crate) fn fail_list(&self, status: u16, body: &str) {
        self.state.lock().unwrap().list_error = Some((status, body.to_string()));
    }

    /// Register a job created outside the code under test
    pub(crate) fn seed(&self, request_id: RequestId, status: RemoteStatus) {
        self.state.lock().unwrap().jobs.insert(
            request_id,
            FakeJob {
                range: None,
                status,
                script: VecDeque::new(),
                parts: vec!["ym:s:visitID\n".to_string()],
            },
        );
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Ids of jobs currently in the given status
    pub(crate) fn jobs_in(&self, status: RemoteStatus) -> Vec<RequestId> {
        self.state
            .lock()
            .unwrap()
            .jobs
            .iter()
            .filter(|(_, job)| job.status == status)
            .map(|(id, _)| *id)
            .collect()
    }
}

fn describe(request_id: RequestId, job: &FakeJob) -> LogRequest {
    let parts = if job.status == RemoteStatus::Processed {
        job.parts
            .iter()
            .zip(0u32..)
            .map(|(text, part_number)| LogRequestPart {
                part_number,
                size: text.len() as u64,
            })
            .collect()
    } else {
        Vec::new()
    };
    LogRequest {
        request_id,
        status: job.status,
        parts,
        fields: Vec::new(),
        date1: job.range.map(|r| r.start),
        date2: job.range.map(|r| r.end),
    }
}

#[async_trait]
impl ReportApi for FakeApi {
    async fn evaluate(
        &self,
        _source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> Result<CapacityEstimate> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Evaluate(range, fields.to_vec()));
        if let Some((status, body)) = state.evaluate_error.clone() {
            return Err(Error::Estimation { status, body });
        }
        Ok(state.estimate)
    }

    async fn create(
        &self,
        _source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> Result<LogRequest> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(range, fields.to_vec()));
        if let Some((status, body)) = state.create_error.clone() {
            return Err(Error::Request { status, body });
        }

        let request_id = RequestId(state.next_id);
        state.next_id += 1;
        let job = FakeJob {
            range: Some(range),
            status: RemoteStatus::Created,
            script: state.script.iter().copied().collect(),
            parts: (state.parts)(range),
        };
        let described = describe(request_id, &job);
        state.jobs.insert(request_id, job);
        Ok(described)
    }

    async fn status(&self, request_id: RequestId) -> Result<LogRequest> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Status(request_id));
        let Some(job) = state.jobs.get_mut(&request_id) else {
            return Err(Error::Status {
                request_id,
                status: 404,
                body: "not found".to_string(),
            });
        };
        if let Some(next) = job.script.pop_front() {
            job.status = next;
        }
        Ok(describe(request_id, job))
    }

    async fn download_part(&self, request_id: RequestId, part: u32) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Download(request_id, part));
        if let Some((status, body)) = state.download_error.clone() {
            return Err(Error::Download {
                request_id,
                part,
                status,
                body,
            });
        }
        state
            .jobs
            .get(&request_id)
            .filter(|job| job.status == RemoteStatus::Processed)
            .and_then(|job| job.parts.get(part as usize).cloned())
            .ok_or_else(|| Error::Download {
                request_id,
                part,
                status: 400,
                body: "no such part".to_string(),
            })
    }

    async fn clean(&self, request_id: RequestId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Clean(request_id));
        let failure = state
            .clean_error
            .clone()
            .or_else(|| state.clean_failures.get(&request_id).cloned());
        if let Some((status, body)) = failure {
            return Err(Error::Deletion {
                request_id,
                status,
                body,
            });
        }
        match state.jobs.get_mut(&request_id) {
            Some(job) if job.status == RemoteStatus::Processed => {
                job.status = RemoteStatus::CleanedByUser;
                Ok(())
            }
            _ => Err(Error::Deletion {
                request_id,
                status: 400,
                body: "report is not processed".to_string(),
            }),
        }
    }

    async fn list(&self) -> Result<Vec<LogRequest>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        if let Some((status, body)) = state.list_error.clone() {
            return Err(Error::Listing { status, body });
        }
        Ok(state
            .jobs
            .iter()
            .map(|(id, job)| describe(*id, job))
            .collect())
    }
}
