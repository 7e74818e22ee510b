//! Backend job API client
//!
//! Stateless request/response mapping against the flashcard generator
//! service. Network-level failures (unreachable, timeout, non-2xx) map to
//! `Error::Transport`; contract violations (malformed body, missing
//! `taskId`, missing `retrievalToken`) map to `Error::Protocol` so the
//! controller can apply the right retry policy to each.

use async_trait::async_trait;
use flashgen_common::models::{
    ExportFormat, FlashcardFile, GenerationRequest, TaskId, TaskProgress,
};
use flashgen_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const GENERATOR_PATH: &str = "/flashcards/generator";
const EXPORTER_PATH: &str = "/flashcards/exporter";

/// Job API surface consumed by the controller
///
/// One production implementation (`HttpTaskClient`); tests script their own.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Submit a generation request; returns the backend task id
    async fn submit(&self, request: &GenerationRequest) -> Result<TaskId>;

    /// Fetch the current progress of a task
    async fn fetch_info(&self, task_id: &TaskId) -> Result<TaskProgress>;

    /// Request cancellation of a task
    async fn cancel(&self, task_id: &TaskId) -> Result<()>;

    /// Exchange a retrieval token for the generated file
    async fn fetch_result(
        &self,
        retrieval_token: &str,
        format: ExportFormat,
    ) -> Result<FlashcardFile>;
}

/// Submission response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    task_id: Option<String>,
}

/// HTTP implementation of the job API
pub struct HttpTaskClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTaskClient {
    /// Create a client for the job service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn generator_url(&self) -> String {
        format!("{}{}", self.base_url, GENERATOR_PATH)
    }

    fn task_url(&self, task_id: &TaskId) -> String {
        format!("{}{}/{}", self.base_url, GENERATOR_PATH, task_id)
    }

    fn exporter_url(&self, retrieval_token: &str, format: ExportFormat) -> String {
        format!(
            "{}{}/{}?format={}",
            self.base_url, EXPORTER_PATH, retrieval_token, format
        )
    }
}

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<TaskId> {
        let url = self.generator_url();
        tracing::debug!(url = %url, "Submitting generation request");

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Protocol(format!("Malformed submit response: {}", e)))?;

        match body.task_id {
            Some(id) if !id.is_empty() => {
                tracing::info!(task_id = %id, "Generation task started");
                Ok(TaskId::new(id))
            }
            _ => Err(Error::Protocol(
                "taskId is missing from the submit response".to_string(),
            )),
        }
    }

    async fn fetch_info(&self, task_id: &TaskId) -> Result<TaskProgress> {
        let url = self.task_url(task_id);
        tracing::debug!(task_id = %task_id, url = %url, "Polling task info");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| Error::Protocol(format!("Malformed task info: {}", e)))
    }

    async fn cancel(&self, task_id: &TaskId) -> Result<()> {
        let url = self.task_url(task_id);
        tracing::debug!(task_id = %task_id, url = %url, "Cancelling task");

        let response = self
            .http_client
            .delete(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        check_status(response).await?;

        // 2xx acknowledged; body ignored
        Ok(())
    }

    async fn fetch_result(
        &self,
        retrieval_token: &str,
        format: ExportFormat,
    ) -> Result<FlashcardFile> {
        let url = self.exporter_url(retrieval_token, format);
        tracing::debug!(url = %url, "Fetching generated file");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition_filename)
            .unwrap_or_else(|| format.fallback_filename());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        tracing::info!(filename = %filename, size = bytes.len(), "File retrieved");

        Ok(FlashcardFile {
            filename,
            bytes: bytes.to_vec(),
        })
    }
}

/// Map a non-2xx status to a transport error
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Transport(format!("HTTP {}: {}", status, body)))
}

/// Extract the filename from a Content-Disposition header value
///
/// Handles `attachment; filename="x.csv"` and the unquoted variant.
fn parse_content_disposition_filename(header: &str) -> Option<String> {
    let marker = "filename=";
    let start = header.find(marker)? + marker.len();
    let rest = &header[start..];
    let value = rest.split(';').next()?.trim();
    let value = value.trim_matches('"');
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
