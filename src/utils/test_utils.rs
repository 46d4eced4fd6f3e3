//! Scripted collaborators for controller, poller and CLI tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{ApiError, BackendApi, Credits, JobStatus, StatusResponse};
use crate::core::events::{EventSink, TransportEvent};
use crate::core::message::{ChatMessage, HistoryItem};
use crate::core::transport::{deliver_frame, FrameSlot, SharedFrameSlot, Transport, TransportError};

pub fn status_record(chat_id: &str, status: JobStatus) -> StatusResponse {
    StatusResponse {
        task_id: "task-1".to_string(),
        user_id: Some("user-1".to_string()),
        chat_id: chat_id.to_string(),
        message_id: "message-1".to_string(),
        status,
        created_at: Some(1_717_171_717.0),
        instance_id: Some("instance-1".to_string()),
        started_at: None,
        completed_at: None,
        result: None,
        error: None,
    }
}

pub fn create_test_message(id: &str, prompt: &str, response: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        prompt: prompt.to_string(),
        response: Some(response.to_string()),
        video_url: None,
    }
}

enum ScriptedStatus {
    Reply(Option<StatusResponse>),
    Error,
}

#[derive(Default)]
struct ScriptedApiState {
    statuses: VecDeque<ScriptedStatus>,
    default_status: Option<StatusResponse>,
    status_calls: usize,
    messages: HashMap<String, Vec<ChatMessage>>,
    message_calls: usize,
    history: Vec<HistoryItem>,
    created: Vec<String>,
}

/// Backend whose replies are queued up front by the test.
///
/// Status replies are consumed in order; once the queue is empty the default
/// status (initially "no job") is returned.
#[derive(Default)]
pub struct ScriptedApi {
    state: Mutex<ScriptedApiState>,
}

impl ScriptedApi {
    fn with_state<R>(&self, f: impl FnOnce(&mut ScriptedApiState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    pub fn push_status(&self, status: Option<StatusResponse>) {
        self.with_state(|state| state.statuses.push_back(ScriptedStatus::Reply(status)));
    }

    pub fn push_status_error(&self) {
        self.with_state(|state| state.statuses.push_back(ScriptedStatus::Error));
    }

    pub fn set_default_status(&self, status: Option<StatusResponse>) {
        self.with_state(|state| state.default_status = status);
    }

    pub fn status_calls(&self) -> usize {
        self.with_state(|state| state.status_calls)
    }

    pub fn set_messages(&self, chat_id: &str, messages: Vec<ChatMessage>) {
        self.with_state(|state| {
            state.messages.insert(chat_id.to_string(), messages);
        });
    }

    pub fn message_calls(&self) -> usize {
        self.with_state(|state| state.message_calls)
    }

    pub fn set_history(&self, history: Vec<HistoryItem>) {
        self.with_state(|state| state.history = history);
    }

    pub fn created_prompts(&self) -> Vec<String> {
        self.with_state(|state| state.created.clone())
    }
}

#[async_trait]
impl BackendApi for ScriptedApi {
    async fn messages(&self, chat_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.with_state(|state| {
            state.message_calls += 1;
            match state.messages.get(chat_id) {
                Some(messages) => Ok(messages.clone()),
                None => Err(ApiError::Status {
                    status: 404,
                    body: format!("chat {chat_id} not found"),
                }),
            }
        })
    }

    async fn history(&self) -> Result<Vec<HistoryItem>, ApiError> {
        Ok(self.with_state(|state| state.history.clone()))
    }

    async fn status(&self) -> Result<Option<StatusResponse>, ApiError> {
        self.with_state(|state| {
            state.status_calls += 1;
            match state.statuses.pop_front() {
                Some(ScriptedStatus::Reply(status)) => Ok(status),
                Some(ScriptedStatus::Error) => Err(ApiError::Status {
                    status: 502,
                    body: "bad gateway".to_string(),
                }),
                None => Ok(state.default_status.clone()),
            }
        })
    }

    async fn create_chat(&self, prompt: &str) -> Result<HistoryItem, ApiError> {
        Ok(self.with_state(|state| {
            state.created.push(prompt.to_string());
            HistoryItem {
                id: format!("chat-{}", state.created.len()),
                title: format!("Chat about {prompt}"),
            }
        }))
    }

    async fn video_url(&self, message_id: &str) -> Result<Option<String>, ApiError> {
        Ok(Some(format!("https://cdn.test/{message_id}.mp4")))
    }

    async fn credits(&self) -> Result<Credits, ApiError> {
        Ok(Credits {
            credits: 5,
            refreshed_at: None,
        })
    }
}

#[derive(Default)]
struct FakeTransportState {
    connected: bool,
    fail_connect: bool,
    fail_send: bool,
    connects: usize,
    sent: Vec<String>,
    lifecycle: Option<EventSink>,
    slot: Option<SharedFrameSlot>,
}

/// In-memory transport. The test keeps a [`FakeTransportHandle`] to play the
/// server side.
pub struct FakeTransport {
    state: Arc<Mutex<FakeTransportState>>,
}

#[derive(Clone)]
pub struct FakeTransportHandle {
    state: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn pair() -> (Self, FakeTransportHandle) {
        let state = Arc::new(Mutex::new(FakeTransportState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            FakeTransportHandle { state },
        )
    }
}

impl FakeTransportHandle {
    pub fn fail_connect(&self) {
        self.state.lock().unwrap().fail_connect = true;
    }

    pub fn fail_send(&self) {
        self.state.lock().unwrap().fail_send = true;
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    /// Server pushes a text frame.
    pub fn push_frame(&self, frame: &str) {
        let slot = self.state.lock().unwrap().slot.clone();
        if let Some(slot) = slot {
            deliver_frame(&slot, frame.to_string());
        }
    }

    pub fn push_frames(&self, frames: &[&str]) {
        for frame in frames {
            self.push_frame(frame);
        }
    }

    /// Server drops the connection.
    pub fn close(&self) {
        self.end_with(TransportEvent::Closed);
    }

    pub fn error(&self, message: &str) {
        self.end_with(TransportEvent::Errored(message.to_string()));
    }

    fn end_with(&self, event: TransportEvent) {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.slot = None;
        if let Some(lifecycle) = state.lifecycle.take() {
            lifecycle.emit(event);
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&mut self, _chat_id: &str, lifecycle: EventSink) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.connected {
            return Err(TransportError::AlreadyConnected);
        }
        if state.fail_connect {
            return Err(TransportError::Handshake("connection refused".to_string()));
        }
        state.connects += 1;
        state.connected = true;
        state.lifecycle = Some(lifecycle);
        state.slot = Some(Arc::new(Mutex::new(FrameSlot::default())));
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_send {
            return Err(TransportError::Send("broken pipe".to_string()));
        }
        state.sent.push(text.to_string());
        Ok(())
    }

    fn set_on_message(&mut self, sink: EventSink) -> Result<(), TransportError> {
        let state = self.state.lock().unwrap();
        match (&state.slot, state.connected) {
            (Some(slot), true) => {
                slot.lock().unwrap().install(sink);
                Ok(())
            }
            _ => Err(TransportError::NotConnected),
        }
    }

    async fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.connected = false;
        state.lifecycle = None;
        state.slot = None;
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}
