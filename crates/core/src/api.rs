use std::path::Path;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::fs;

use crate::{
    config::ClientConfig,
    error::{KonspektError, Result},
    types::TaskSnapshot,
};

/// The five backend calls the client consumes. Kept behind a trait so the
/// submission, polling and chat logic can run against a scripted fake.
#[async_trait]
pub trait SummarizerApi: Send + Sync {
    /// POST /api/process - one batch call for the whole URL list. Returns
    /// task ids in the same order as the submitted URLs.
    async fn create_jobs(&self, urls: &[String], custom_style: &str) -> Result<Vec<String>>;

    /// POST /api/upload - one media file per call.
    async fn upload_media(&self, file: &Path, custom_style: &str) -> Result<String>;

    /// GET /api/status/{task_id} - full snapshot of the task's current state.
    async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot>;

    /// POST /api/ask - ad-hoc question against a completed task's content.
    async fn ask(&self, task_id: &str, question: &str) -> Result<String>;

    /// POST /api/save - persist a completed result server-side. Returns the
    /// server-side path.
    async fn save_result(&self, task_id: &str) -> Result<String>;
}

/// `reqwest`-backed implementation of the backend contract.
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request_json(
        &self,
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<serde_json::Value> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        normalize_response(status, &body, fallback)
    }
}

/// Normalize a raw response per the shared backend contract: an explicit
/// `error` field and a non-2xx status are the same failure, carrying the
/// provided message or the fallback when the body has nothing usable.
fn normalize_response(status: StatusCode, body: &str, fallback: &str) -> Result<serde_json::Value> {
    let value: Option<serde_json::Value> = serde_json::from_str(body).ok();

    let reported = value
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.as_str())
        .map(str::to_string);
    if let Some(message) = reported {
        return Err(KonspektError::Backend { message });
    }

    if !status.is_success() {
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            fallback.to_string()
        } else {
            trimmed.to_string()
        };
        return Err(KonspektError::Backend { message });
    }

    value.ok_or(KonspektError::MalformedResponse { field: "body" })
}

fn string_field(value: &serde_json::Value, field: &'static str) -> Result<String> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(KonspektError::MalformedResponse { field })
}

#[async_trait]
impl SummarizerApi for HttpApi {
    async fn create_jobs(&self, urls: &[String], custom_style: &str) -> Result<Vec<String>> {
        let value = self
            .request_json(
                self.client
                    .post(self.endpoint("/api/process"))
                    .json(&serde_json::json!({ "urls": urls, "customStyle": custom_style })),
                "Processing request failed",
            )
            .await?;

        value
            .get("task_ids")
            .and_then(|v| v.as_array())
            .and_then(|ids| {
                ids.iter()
                    .map(|id| id.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or(KonspektError::MalformedResponse { field: "task_ids" })
    }

    async fn upload_media(&self, file: &Path, custom_style: &str) -> Result<String> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        let bytes = fs::read(file).await?;

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone()),
            )
            .text("customStyle", custom_style.to_string());

        let value = self
            .request_json(
                self.client.post(self.endpoint("/api/upload")).multipart(form),
                &format!("Upload failed for {file_name}"),
            )
            .await?;

        string_field(&value, "task_id")
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let value = self
            .request_json(
                self.client
                    .get(self.endpoint(&format!("/api/status/{task_id}"))),
                "Status request failed",
            )
            .await?;

        let data = value
            .get("data")
            .ok_or(KonspektError::MalformedResponse { field: "data" })?;
        let snapshot: TaskSnapshot = serde_json::from_value(data.clone())?;
        Ok(snapshot)
    }

    async fn ask(&self, task_id: &str, question: &str) -> Result<String> {
        let value = self
            .request_json(
                self.client
                    .post(self.endpoint("/api/ask"))
                    .json(&serde_json::json!({ "taskId": task_id, "question": question })),
                "Question request failed",
            )
            .await?;

        string_field(&value, "answer")
    }

    async fn save_result(&self, task_id: &str) -> Result<String> {
        let value = self
            .request_json(
                self.client
                    .post(self.endpoint("/api/save"))
                    .json(&serde_json::json!({ "taskId": task_id })),
                "Save request failed",
            )
            .await?;

        string_field(&value, "path")
    }
}
