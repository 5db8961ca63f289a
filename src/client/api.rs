use log::debug;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::ClientError;
use crate::analytics::TaskSummary;
use crate::auth::AuthResponse;
use crate::models::{CreateTaskRequest, PublicUser, Task, TaskStatus, UpdateTaskRequest};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Thin typed wrapper over the REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
        request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ClientError::Offline(e.to_string())
            } else {
                ClientError::Transport(e)
            }
        })
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("API error {}: {}", status, body);
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| match status {
                StatusCode::NOT_FOUND => "task not found".to_string(),
                other => other.canonical_reason().unwrap_or("request failed").to_string(),
            });
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ClientError> {
        let request = self
            .http
            .post(self.url("/auth/signup"))
            .json(&json!({ "name": name, "email": email, "password": password }));
        Self::read(Self::send(request).await?).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let request = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        Self::read(Self::send(request).await?).await
    }

    pub async fn me(&self) -> Result<PublicUser, ClientError> {
        let request = self.authed(self.http.get(self.url("/auth/me")))?;
        Self::read(Self::send(request).await?).await
    }

    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>, ClientError> {
        let mut request = self.authed(self.http.get(self.url("/tasks")))?;
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        Self::read(Self::send(request).await?).await
    }

    pub async fn create_task(&self, task: &CreateTaskRequest) -> Result<Task, ClientError> {
        let request = self.authed(self.http.post(self.url("/tasks")).json(task))?;
        Self::read(Self::send(request).await?).await
    }

    pub async fn update_task(
        &self,
        id: &str,
        changes: &UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        let path = format!("/tasks/{}", id);
        let request = self.authed(self.http.patch(self.url(&path)).json(changes))?;
        Self::read(Self::send(request).await?).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<Task, ClientError> {
        let path = format!("/tasks/{}", id);
        let request = self.authed(self.http.delete(self.url(&path)))?;
        Self::read(Self::send(request).await?).await
    }

    pub async fn summary(&self) -> Result<TaskSummary, ClientError> {
        let request = self.authed(self.http.get(self.url("/tasks/summary")))?;
        Self::read(Self::send(request).await?).await
    }
}
