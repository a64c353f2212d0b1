//! HTTP client for the scheduler API.
//!
//! Every operation is a single request. Transport failures are returned to
//! the caller as they happen; nothing is retried here.

use std::sync::Arc;
use std::time::Duration;

use nh_jobspec::{Job, JobSpec, JobTemplate, Templates};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::types::{
    Allocation, AllocationList, BlockingResponse, EvalResponse, JobSummary, NodeSummary,
};

/// Response header carrying the blocking-query cursor.
pub const INDEX_HEADER: &str = "x-nomad-index";

/// Extra time granted to a blocking query on top of its wait, covering the
/// scheduler's wait jitter (up to wait/16) and the round trip.
const BLOCKING_GRACE: Duration = Duration::from_secs(5);

/// Client for one scheduler agent.
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    client: reqwest::Client,
    base_url: String,
    base: Url,
    templates: Arc<Templates>,
}

impl SchedulerClient {
    /// Create a client for `address`, given as `host:port` or a full `http(s)://` URL.
    pub fn new(address: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = base_url(address)?;
        Ok(Self {
            client,
            base: parse_base(&base_url)?,
            base_url,
            templates: Arc::new(Templates::builtin()),
        })
    }

    /// Use these skeletons for jobs created or fetched through this client.
    pub fn with_templates(mut self, templates: Templates) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint URL from path segments. Each segment is percent-encoded, so a
    /// name containing `/`, `?` or `#` stays a single segment.
    fn url(&self, segments: &[&str]) -> Url {
        join(&self.base, segments)
    }

    /// Start a new job document locally. No request is made.
    pub fn create_job(&self, name: &str) -> JobTemplate {
        JobTemplate::with_templates(name, Arc::clone(&self.templates))
    }

    /// Fetch a job by name.
    ///
    /// Any response whose body is not a JSON object (e.g. a plain-text
    /// "job not found") means the job does not exist.
    pub async fn find_job(&self, name: &str) -> Result<Option<JobTemplate>, ClientError> {
        let url = self.url(&["v1", "job", name]);
        debug!(url = %url, "Fetching job");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let value = match serde_json::from_slice::<Value>(&body) {
            Ok(value @ Value::Object(_)) => value,
            _ => {
                debug!(job = name, status = %status, "Job not found");
                return Ok(None);
            }
        };

        let job: Job = serde_json::from_value(value)?;
        Ok(Some(JobTemplate::from_spec_with_templates(
            JobSpec { job },
            Arc::clone(&self.templates),
        )))
    }

    /// List all jobs.
    pub async fn jobs(&self) -> Result<Vec<JobSummary>, ClientError> {
        self.get_json(&["v1", "jobs"]).await
    }

    /// Submit a job document for scheduling.
    pub async fn submit_job(&self, job: &JobTemplate) -> Result<EvalResponse, ClientError> {
        let url = self.url(&["v1", "job", ""]);
        debug!(url = %url, job = job.id(), "Submitting job");

        let response = self.client.post(url).json(job.job()).send().await?;
        handle_response(response).await
    }

    /// Dry-run a job document and return the scheduler's plan.
    pub async fn plan_job(&self, job: &JobTemplate, name: &str) -> Result<Value, ClientError> {
        let url = self.url(&["v1", "job", name, "plan"]);
        debug!(url = %url, "Planning job");

        let response = self.client.post(url).json(job.job()).send().await?;
        handle_response(response).await
    }

    /// Deregister a job.
    pub async fn delete_job(&self, name: &str) -> Result<EvalResponse, ClientError> {
        let url = self.url(&["v1", "job", name]);
        debug!(url = %url, "Deleting job");

        let response = self.client.delete(url).send().await?;
        handle_response(response).await
    }

    /// Fetch one allocation by ID.
    pub async fn allocation(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&["v1", "allocation", id]).await
    }

    /// List the allocations of a job.
    pub async fn allocations(&self, job: &str) -> Result<AllocationList, ClientError> {
        self.get_json(&["v1", "job", job, "allocations"]).await
    }

    /// Blocking query for a job's allocations.
    ///
    /// The scheduler holds the request until its state moves past `index` or
    /// `wait` elapses, and returns the new cursor in [`INDEX_HEADER`].
    pub async fn allocations_blocking(
        &self,
        job: &str,
        index: u64,
        wait: Duration,
    ) -> Result<BlockingResponse<Vec<Allocation>>, ClientError> {
        let mut url = self.url(&["v1", "job", job, "allocations"]);
        url.query_pairs_mut()
            .append_pair("index", &index.to_string())
            .append_pair("wait", &wait_param(wait));
        debug!(url = %url, "Issuing blocking allocation query");

        let response = self
            .client
            .get(url)
            .timeout(wait + wait / 16 + BLOCKING_GRACE)
            .send()
            .await?;

        let index = index_header(response.headers());
        let value = handle_response(response).await?;
        Ok(BlockingResponse { index, value })
    }

    /// List the nodes of the local region.
    pub async fn nodes(&self) -> Result<Vec<NodeSummary>, ClientError> {
        self.get_json(&["v1", "nodes"]).await
    }

    /// Fetch the full status of one node.
    pub async fn node_status(&self, id: &str) -> Result<Value, ClientError> {
        self.get_json(&["v1", "node", id]).await
    }

    /// Fetch host resource usage from the client agent at `agent_address`.
    pub async fn resource_usage(&self, agent_address: &str) -> Result<Value, ClientError> {
        let agent = parse_base(&base_url(agent_address)?)?;
        let url = join(&agent, &["v1", "client", "stats"]);
        debug!(url = %url, "Fetching client stats");

        let response = self.client.get(url).send().await?;
        handle_response(response).await
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        self.url(segments)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let url = self.url(segments);
        debug!(url = %url, "GET");

        let response = self.client.get(url).send().await?;
        handle_response(response).await
    }
}

/// Decode a successful JSON body or turn the status into [`ClientError::Api`].
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(response).await);
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

pub(crate) async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(status, body = %body, "Scheduler request failed");
    ClientError::Api { status, body }
}

fn index_header(headers: &HeaderMap) -> u64 {
    let index = headers
        .get(INDEX_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok());
    if index.is_none() {
        warn!("Blocking response carried no usable index header, restarting from 0");
    }
    index.unwrap_or(0)
}

/// Go duration string for the `wait` parameter. Sub-second waits are sent in
/// milliseconds so they are not truncated to a non-blocking `0s`.
fn wait_param(wait: Duration) -> String {
    if wait.subsec_nanos() == 0 {
        format!("{}s", wait.as_secs())
    } else {
        format!("{}ms", wait.as_millis().max(1))
    }
}

fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

fn parse_base(base_url: &str) -> Result<Url, ClientError> {
    match Url::parse(base_url) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        _ => Err(ClientError::InvalidAddress(base_url.to_string())),
    }
}

fn base_url(address: &str) -> Result<String, ClientError> {
    let address = address.trim().trim_end_matches('/');
    if address.is_empty() {
        return Err(ClientError::InvalidAddress(address.to_string()));
    }
    if address.starts_with("http://") || address.starts_with("https://") {
        Ok(address.to_string())
    } else {
        Ok(format!("http://{address}"))
    }
}
