//! Wire payloads exchanged with the generation backend.
//!
//! These mirror the JSON the backend emits; [`crate::core::message`] holds the
//! in-memory shapes the session controller works with.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::message::{ChatMessage, HistoryItem};

pub mod client;

pub use client::{ApiClient, ApiError, BackendApi};

#[derive(Serialize)]
pub struct CreateChatRequest<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatResponse {
    pub id: String,
    pub title: String,
}

impl From<CreateChatResponse> for HistoryItem {
    fn from(value: CreateChatResponse) -> Self {
        HistoryItem {
            id: value.id,
            title: value.title,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub title: String,
}

impl From<HistoryRecord> for HistoryItem {
    fn from(value: HistoryRecord) -> Self {
        HistoryItem {
            id: value.id,
            title: value.title,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl From<MessageRecord> for ChatMessage {
    fn from(value: MessageRecord) -> Self {
        ChatMessage {
            id: value.id,
            prompt: value.prompt,
            response: value.response,
            video_url: value.video_url.filter(|url| !url.is_empty()),
        }
    }
}

/// Lifecycle of a server-side generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_in_progress(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub task_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub chat_id: String,
    pub message_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<f64>,
    #[serde(default)]
    pub completed_at: Option<f64>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn is_in_progress_for(&self, chat_id: &str) -> bool {
        self.status.is_in_progress() && self.chat_id == chat_id
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoUrlResponse {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credits {
    pub credits: i64,
    #[serde(default)]
    pub refreshed_at: Option<String>,
}

impl Credits {
    /// Parses `refreshed_at`, accepting both RFC 3339 and the naive ISO form
    /// the backend emits for UTC timestamps.
    pub fn refreshed_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.refreshed_at.as_deref()?.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
