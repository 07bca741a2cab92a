use std::env;
use std::time::Duration;

use chrono::Local;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::{Error, Result};
use crate::models::{
    CreateTaskRequest, ProgressByUser, ProgressPayload, SetCompletedRequest, Task,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side face of the remote task API. Holds no DOM or view
/// state; callers cache what they need.
pub struct TaskStore {
    client: Client,
    base_url: String,
}

impl TaskStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("DAILY_QUEST_API").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let response = self.client.get(self.url("/tasks")).send().await?;
        let response = expect_success(response).await?;
        decode_json(response).await
    }

    /// The caller is responsible for trimming and rejecting empty
    /// content before this point; the store passes input through.
    pub async fn create_task(&self, user_id: u8, content: &str) -> Result<Task> {
        let response = self
            .client
            .post(self.url("/tasks"))
            .json(&CreateTaskRequest { content, user_id })
            .send()
            .await?;
        if response.status().is_client_error() {
            return Err(Error::validation(body_message(response).await));
        }
        let response = expect_success(response).await?;
        let task: Task = decode_json(response).await?;
        info!(id = task.id, user_id, "task created");
        Ok(task)
    }

    /// Idempotent: setting the same value twice yields the same state.
    pub async fn set_completed(&self, task_id: u64, completed: bool) -> Result<Task> {
        let response = self
            .client
            .put(self.url(&format!("/tasks/{task_id}")))
            .json(&SetCompletedRequest { completed })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(task_id));
        }
        if response.status().is_client_error() {
            return Err(Error::validation(body_message(response).await));
        }
        let response = expect_success(response).await?;
        decode_json(response).await
    }

    /// A second delete of an already-deleted id is not an error: the
    /// server's not-found answer is swallowed.
    pub async fn delete_task(&self, task_id: u64) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{task_id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(id = task_id, "delete for already-absent task");
            return Ok(());
        }
        expect_success(response).await?;
        Ok(())
    }

    pub async fn fetch_progress(&self, timeframe_days: u32) -> Result<ProgressByUser> {
        let response = self
            .client
            .get(self.url(&format!("/progress?timeframe={timeframe_days}")))
            .send()
            .await?;
        let response = expect_success(response).await?;
        let payload: ProgressPayload = decode_json(response).await?;
        payload.into_by_user(Local::now().date_naive())
    }

    pub async fn fetch_export(&self, timeframe_days: u32) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(self.url(&format!("/export?timeframe={timeframe_days}")))
            .send()
            .await?;
        let response = expect_success(response).await?;
        decode_json(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn expect_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(Error::network(format!(
        "server answered {status}: {}",
        body_message(response).await
    )))
}

async fn body_message(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "unreadable response body".to_string())
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| Error::protocol(err.to_string()))
}
