//! Splitting a date span into ranges the server can serve in one report
//!
//! The server answers an evaluate call with whether the whole span fits in a
//! single report and, if not, how many days one report may cover. [`plan`]
//! turns that answer into contiguous, non-overlapping sub-ranges that cover
//! the span exactly, each no longer than the allowed number of days.

use crate::client::ReportApi;
use crate::config::ReportQuery;
use crate::error::Result;
use crate::types::DateRange;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Server's answer to "can this span be served by one report?"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityEstimate {
    /// The whole span fits in one report
    pub possible: bool,
    /// Longest span one report may cover, in days
    #[serde(default)]
    pub max_possible_day_quantity: u32,
}

/// Split `range` according to `estimate`
///
/// A feasible estimate yields `range` unchanged. Otherwise the span is cut into
/// `days / max + 1` periods of `days / periods + 1` days each, the last one
/// clamped to `range.end`. A zero day quantity is read as one day per report.
pub fn plan(range: DateRange, estimate: &CapacityEstimate) -> Vec<DateRange> {
    if estimate.possible {
        return vec![range];
    }

    let days = range.days().max(0);
    let max_days = i64::from(estimate.max_possible_day_quantity.max(1));
    let num_requests = days / max_days + 1;
    let days_in_period = days / num_requests + 1;

    (0..num_requests)
        .map(|i| {
            let start = range.start + TimeDelta::days(i * days_in_period);
            let end = (range.start + TimeDelta::days((i + 1) * days_in_period - 1)).min(range.end);
            DateRange::new(start, end)
        })
        .take_while(|r| r.start <= range.end)
        .collect()
}

/// Ask the server for a capacity estimate of the whole query and plan from it
///
/// # Errors
/// Returns [`crate::Error::Estimation`] when the evaluate call is rejected
pub async fn plan_ranges<A>(api: &A, query: &ReportQuery) -> Result<Vec<DateRange>>
where
    A: ReportApi + ?Sized,
{
    let estimate = api
        .evaluate(query.source, &query.fields, query.range)
        .await?;
    let ranges = plan(query.range, &estimate);

    info!(
        range = %query.range,
        possible = estimate.possible,
        max_days = estimate.max_possible_day_quantity,
        requests = ranges.len(),
        "planned report requests"
    );

    Ok(ranges)
}
