//! HTTP implementation of [`ReportApi`]

use super::traits::ReportApi;
use crate::config::{Account, Config};
use crate::error::{Error, Result};
use crate::planner::CapacityEstimate;
use crate::types::{CounterId, DateRange, LogRequest, LogSource, RequestId};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::debug;
use url::Url;

#[derive(Deserialize)]
struct EvaluationEnvelope {
    log_request_evaluation: CapacityEstimate,
}

#[derive(Deserialize)]
struct LogRequestEnvelope {
    log_request: LogRequest,
}

#[derive(Deserialize)]
struct LogRequestList {
    #[serde(default)]
    requests: Vec<LogRequest>,
}

/// Logs API client bound to one account
///
/// All paths live below `{api_host}/management/v1/counter/{counter_id}/` and
/// every call carries an `Authorization: OAuth <token>` header.
#[derive(Clone, Debug)]
pub struct LogsApiClient {
    http: reqwest::Client,
    base: Url,
    account: Account,
}

impl LogsApiClient {
    /// Create a client for `account`
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the configuration is invalid, or
    /// [`Error::Network`] if the HTTP client cannot be built
    pub fn new(config: &Config, account: Account) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("logs-report-dl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base = counter_base(&config.api_host, account.counter_id())?;

        Ok(Self {
            http,
            base,
            account,
        })
    }

    /// The account this client acts for
    pub fn account(&self) -> &Account {
        &self.account
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| Error::Config {
            message: format!("cannot build URL for '{}': {}", path, e),
            key: Some("api_host".to_string()),
        })
    }

    fn report_params(
        source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> [(&'static str, String); 4] {
        [
            ("date1", range.date1()),
            ("date2", range.date2()),
            ("source", source.as_str().to_string()),
            ("fields", fields.join(",")),
        ]
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        debug!(%url, "GET");
        Ok(self
            .http
            .get(url)
            .header(AUTHORIZATION, self.account.authorization())
            .send()
            .await?)
    }

    async fn post(&self, url: Url) -> Result<reqwest::Response> {
        debug!(%url, "POST");
        Ok(self
            .http
            .post(url)
            .header(AUTHORIZATION, self.account.authorization())
            .send()
            .await?)
    }
}

/// `{host}/management/v1/counter/{counter}/`, with the counter percent-encoded
fn counter_base(host: &str, counter_id: &CounterId) -> Result<Url> {
    let invalid = |message: String| Error::Config {
        message,
        key: Some("api_host".to_string()),
    };

    let mut url = Url::parse(host).map_err(|e| invalid(format!("invalid API host '{host}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("API host '{host}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(["management", "v1", "counter", counter_id.as_str(), ""]);
    Ok(url)
}

/// Body of a successful response, or the error built from status and body
async fn success_body<F>(response: reqwest::Response, on_error: F) -> Result<String>
where
    F: FnOnce(u16, String) -> Error,
{
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(on_error(status.as_u16(), body))
    }
}

#[async_trait]
impl ReportApi for LogsApiClient {
    async fn evaluate(
        &self,
        source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> Result<CapacityEstimate> {
        let mut url = self.url("logrequests/evaluate")?;
        url.query_pairs_mut()
            .extend_pairs(Self::report_params(source, fields, range));

        let response = self.get(url).await?;
        let body = success_body(response, |status, body| Error::Estimation { status, body }).await?;
        let envelope: EvaluationEnvelope = serde_json::from_str(&body)?;
        Ok(envelope.log_request_evaluation)
    }

    async fn create(
        &self,
        source: LogSource,
        fields: &[String],
        range: DateRange,
    ) -> Result<LogRequest> {
        let mut url = self.url("logrequests")?;
        url.query_pairs_mut()
            .extend_pairs(Self::report_params(source, fields, range));

        let response = self.post(url).await?;
        let body = success_body(response, |status, body| Error::Request { status, body }).await?;
        let envelope: LogRequestEnvelope = serde_json::from_str(&body)?;
        Ok(envelope.log_request)
    }

    async fn status(&self, request_id: RequestId) -> Result<LogRequest> {
        let url = self.url(&format!("logrequest/{request_id}"))?;

        let response = self.get(url).await?;
        let body = success_body(response, |status, body| Error::Status {
            request_id,
            status,
            body,
        })
        .await?;
        let envelope: LogRequestEnvelope = serde_json::from_str(&body)?;
        Ok(envelope.log_request)
    }

    async fn download_part(&self, request_id: RequestId, part: u32) -> Result<String> {
        let url = self.url(&format!("logrequest/{request_id}/part/{part}/download"))?;

        let response = self.get(url).await?;
        success_body(response, |status, body| Error::Download {
            request_id,
            part,
            status,
            body,
        })
        .await
    }

    async fn clean(&self, request_id: RequestId) -> Result<()> {
        let url = self.url(&format!("logrequest/{request_id}/clean"))?;

        let response = self.post(url).await?;
        success_body(response, |status, body| Error::Deletion {
            request_id,
            status,
            body,
        })
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<LogRequest>> {
        let url = self.url("logrequests")?;

        let response = self.get(url).await?;
        let body = success_body(response, |status, body| Error::Listing { status, body }).await?;
        let list: LogRequestList = serde_json::from_str(&body)?;
        Ok(list.requests)
    }
}
