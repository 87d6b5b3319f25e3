//! Authenticated client for the task backend.
//!
//! # Flow
//!
//! ```text
//! RequestDescriptor -> ApiClient::request
//!     |  attach `Authorization: Bearer` if the credential store has one
//!     v
//! HttpTransport::send  (ReqwestTransport in production)
//!     |
//!     +-- transport failure -> ApiError::Network
//!     +-- 401               -> drop the credential if it is still the one sent,
//!     |                        Navigator::navigate("/signin"), ApiError::Unauthorized
//!     +-- other non-2xx     -> ApiError::RequestFailed { detail | message | "HTTP <status>" }
//!     +-- 204               -> Ok(None)
//!     +-- 2xx               -> Ok(Some(parsed JSON)), parse errors propagate
//! ```
//!
//! Nothing is retried and no timeout is imposed.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, TransportError};
use crate::guard::SIGN_IN_PATH;
use crate::session::CredentialStore;
use crate::task::{CreateTaskRequest, Task, UpdateTaskRequest};
use crate::validation::{validate_description, validate_title};

pub const TASKS_PATH: &str = "/api/me/tasks";

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    /// Appended after `path`, each percent-encoded as one segment.
    pub segments: Vec<String>,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            body: None,
            query: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Resolves against `base` the way a browser resolves a relative URL.
    pub fn resolve(&self, base: &Url) -> Result<Url, ApiError> {
        let mut url = base
            .join(&self.path)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.path)))?;
        if !self.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(format!("{base} cannot be a base")))?
                .pop_if_empty()
                .extend(&self.segments);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Whatever actually moves bytes. Failures here are transport-level only;
/// HTTP error statuses come back as ordinary responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

/// Forced navigation, used when the backend rejects the session.
/// Calling it repeatedly with the same target must be harmless.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Pulls a human-readable message out of an error body.
pub fn error_message(status: u16, body: &[u8]) -> String {
    extract_detail(body).unwrap_or_else(|| format!("HTTP {status}"))
}

pub(crate) fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["detail", "message"]
        .iter()
        .filter_map(|key| value.get(key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        base_url: Url,
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            base_url,
            transport,
            credentials,
            navigator,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Sends the request and returns the raw response, whatever its status.
    pub(crate) async fn exchange(
        &self,
        descriptor: &RequestDescriptor,
        bearer: Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let url = descriptor.resolve(&self.base_url)?;
        debug!("{} {}", descriptor.method, url.path());

        let request = HttpRequest {
            method: descriptor.method.clone(),
            url,
            bearer,
            body: descriptor.body.clone(),
        };
        self.transport.send(request).await.map_err(|e| {
            warn!("{} {} failed: {e}", descriptor.method, descriptor.path);
            ApiError::Network(e)
        })
    }

    /// The single request primitive. `Ok(None)` means 204 No Content.
    pub async fn request<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<Option<T>, ApiError> {
        let bearer = self.credentials.get();
        let response = self.exchange(&descriptor, bearer.clone()).await?;

        match response.status {
            401 => {
                warn!("{} {}: session rejected", descriptor.method, descriptor.path);
                // A sign-in that landed while this call was in flight keeps its token.
                if let Some(token) = bearer.as_deref() {
                    if let Err(err) = self.credentials.remove_if_matches(token) {
                        warn!("Failed to clear rejected session: {err}");
                    }
                }
                self.navigator.navigate(SIGN_IN_PATH);
                Err(ApiError::Unauthorized)
            }
            204 => Ok(None),
            status if !response.is_success() => {
                let message = error_message(status, &response.body);
                warn!("{} {} -> {status}: {message}", descriptor.method, descriptor.path);
                Err(ApiError::RequestFailed { status, message })
            }
            _ => Ok(Some(serde_json::from_slice(&response.body)?)),
        }
    }

    async fn request_body<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> Result<T, ApiError> {
        match self.request(descriptor).await? {
            Some(body) => Ok(body),
            // A typed endpoint answering 204 still has to produce a value.
            None => Ok(serde_json::from_value(Value::Null)?),
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let descriptor = query
            .iter()
            .fold(RequestDescriptor::get(path), |d, (k, v)| d.query(*k, *v));
        self.request_body(descriptor).await
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.request_body(RequestDescriptor::get(TASKS_PATH)).await
    }

    pub async fn create_task(&self, data: &CreateTaskRequest) -> Result<Task, ApiError> {
        validate_title(&data.title)?;
        validate_description(data.description.as_deref().unwrap_or_default())?;
        self.request_body(RequestDescriptor::post(TASKS_PATH).json(data)?)
            .await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, ApiError> {
        self.request_body(RequestDescriptor::get(TASKS_PATH).segment(task_id))
            .await
    }

    pub async fn update_task(
        &self,
        task_id: &str,
        data: &UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        if let Some(title) = &data.title {
            validate_title(title)?;
        }
        if let Some(description) = &data.description {
            validate_description(description)?;
        }
        self.request_body(
            RequestDescriptor::put(TASKS_PATH)
                .segment(task_id)
                .json(data)?,
        )
        .await
    }

    /// Accepts 204 as well as a 2xx carrying a confirmation body.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), ApiError> {
        self.request::<Value>(RequestDescriptor::delete(TASKS_PATH).segment(task_id))
            .await?;
        Ok(())
    }

    pub async fn toggle_task_completion(&self, task_id: &str) -> Result<Task, ApiError> {
        self.request_body(
            RequestDescriptor::patch(TASKS_PATH)
                .segment(task_id)
                .segment("complete"),
        )
        .await
    }
}
