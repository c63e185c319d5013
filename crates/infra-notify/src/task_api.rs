// HTTP TaskDirectory Implementation
//
// Reads tasks (and, when needed, their assignee) from the CRUD service:
//   GET {base}/tasks/{id}  -> task snapshot, assignee as id or object
//   GET {base}/users/{id}  -> {id, email}

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use todocore_core::domain::{EntityId, EntityRef, TaskRecord, UserRecord};
use todocore_core::error::{AppError, Result};
use todocore_core::port::TaskDirectory;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpTaskDirectory {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTaskDirectory {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// GET `{base}/{resource}/{id}`; Ok(None) on 404
    async fn fetch<T: DeserializeOwned>(&self, resource: &str, id: EntityId) -> Result<Option<T>> {
        let url = format!("{}/{}/{}", self.base_url, resource, id);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GET {}: {}", url, e)))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| AppError::Upstream(format!("GET {}: invalid body: {}", url, e))),
            status => Err(AppError::Upstream(format!("GET {}: status {}", url, status))),
        }
    }
}

#[async_trait]
impl TaskDirectory for HttpTaskDirectory {
    async fn find_task(&self, id: EntityId) -> Result<Option<TaskRecord>> {
        let Some(mut task) = self.fetch::<TaskRecord>("tasks", id).await? else {
            return Ok(None);
        };

        if let EntityRef::Id(user_id) = task.assignee {
            match self.fetch::<UserRecord>("users", user_id).await? {
                Some(user) => task.assignee = EntityRef::Resolved(user),
                None => debug!(task_id = %id, user_id = %user_id, "Assignee not found"),
            }
        }

        Ok(Some(task))
    }
}
