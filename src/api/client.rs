use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{
    CreateChatRequest, CreateChatResponse, Credits, HistoryRecord, MessageRecord, StatusResponse,
    VideoUrlResponse,
};
use crate::core::config::Config;
use crate::core::message::{ChatMessage, HistoryItem};
use crate::utils::url::construct_api_url;

/// Failures talking to the REST half of the backend.
#[derive(Debug)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    Request(reqwest::Error),
    /// The backend answered with a non-success status code.
    Status { status: u16, body: String },
    /// The body could not be decoded into the expected shape.
    Decode(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Request(err) => write!(f, "API request failed: {err}"),
            ApiError::Status { status, body } => {
                write!(f, "API request failed with status {status}: {body}")
            }
            ApiError::Decode(err) => write!(f, "Unexpected API response: {err}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Request(err) => Some(err),
            ApiError::Decode(err) => Some(err),
            ApiError::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Request(value)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::Decode(value)
    }
}

/// Queries the session controller needs from the backend.
///
/// Kept as a trait so the controller and poller can run against a scripted
/// backend in tests.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    async fn history(&self) -> Result<Vec<HistoryItem>, ApiError>;

    /// The job currently running for the user, or `None` when the backend
    /// reports no job at all.
    async fn status(&self) -> Result<Option<StatusResponse>, ApiError>;

    async fn create_chat(&self, prompt: &str) -> Result<HistoryItem, ApiError>;

    async fn video_url(&self, message_id: &str) -> Result<Option<String>, ApiError>;

    async fn credits(&self) -> Result<Credits, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl ApiClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            api_token,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            reqwest::Client::new(),
            &config.resolved_api_url(),
            config.api_token.clone(),
        )
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        let request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_body(request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let endpoint = format!("chat/messages/{chat_id}");
        let body = Self::read_body(self.request(reqwest::Method::GET, &endpoint)).await?;
        let records: Vec<MessageRecord> = serde_json::from_str(&body)?;
        debug!(chat_id, count = records.len(), "fetched chat messages");
        Ok(records.into_iter().map(ChatMessage::from).collect())
    }

    async fn history(&self) -> Result<Vec<HistoryItem>, ApiError> {
        let body = Self::read_body(self.request(reqwest::Method::GET, "chat/history")).await?;
        let records: Vec<HistoryRecord> = serde_json::from_str(&body)?;
        Ok(records.into_iter().map(HistoryItem::from).collect())
    }

    async fn status(&self) -> Result<Option<StatusResponse>, ApiError> {
        let body = Self::read_body(self.request(reqwest::Method::GET, "chat/running")).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str::<Option<StatusResponse>>(&body)?)
    }

    async fn create_chat(&self, prompt: &str) -> Result<HistoryItem, ApiError> {
        let request = self
            .request(reqwest::Method::POST, "chat/create")
            .json(&CreateChatRequest { prompt });
        let body = Self::read_body(request).await?;
        let created: CreateChatResponse = serde_json::from_str(&body)?;
        debug!(chat_id = %created.id, "created chat");
        Ok(created.into())
    }

    async fn video_url(&self, message_id: &str) -> Result<Option<String>, ApiError> {
        let endpoint = format!("chat/message/video/{message_id}");
        let body = Self::read_body(self.request(reqwest::Method::GET, &endpoint)).await?;
        let response: VideoUrlResponse = serde_json::from_str(&body)?;
        Ok(response.video_url.filter(|url| !url.is_empty()))
    }

    async fn credits(&self) -> Result<Credits, ApiError> {
        let body = Self::read_body(self.request(reqwest::Method::GET, "chat/credits")).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
