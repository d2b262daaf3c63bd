use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered 503 because its store is not connected.
    #[error("{message}")]
    Unavailable { message: String },
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::Unavailable { .. })
    }
}

/// Fields to change on an existing task. Unset fields are left alone.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
struct CreateTaskBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClearCompletedBody {
    #[serde(default)]
    count: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn create_task(
        &self,
        text: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<Task, ApiError>;
    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, ApiError>;
    async fn delete_task(&self, id: &str) -> Result<(), ApiError>;
    /// Returns how many tasks the server removed.
    async fn clear_completed(&self) -> Result<u64, ApiError>;
}

/// [`TaskApi`] backed by the server's JSON API.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

/// Turns a non-success response into an [`ApiError`], preferring the
/// server's `message` over `fallback`.
async fn check(response: reqwest::Response, fallback: &str) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<MessageBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("{} ({})", fallback, status.as_u16()));

    if status == StatusCode::SERVICE_UNAVAILABLE {
        Err(ApiError::Unavailable { message })
    } else {
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let response = self.client.get(self.url("/tasks")).send().await?;
        let tasks = check(response, "Failed to fetch tasks").await?.json().await?;
        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn create_task(
        &self,
        text: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<Task, ApiError> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .json(&CreateTaskBody { text, date })
            .send()
            .await?;
        let task = check(response, "Failed to add task").await?.json().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<Task, ApiError> {
        let response = self
            .client
            .patch(self.url(&format!("/tasks/{}", id)))
            .json(&update)
            .send()
            .await?;
        let task = check(response, "Failed to update task").await?.json().await?;
        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{}", id)))
            .send()
            .await?;
        check(response, "Failed to delete task").await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn clear_completed(&self) -> Result<u64, ApiError> {
        let response = self
            .client
            .delete(self.url("/tasks/completed/all"))
            .send()
            .await?;
        let body: ClearCompletedBody = check(response, "Failed to clear completed tasks")
            .await?
            .json()
            .await?;
        Ok(body.count)
    }
}
