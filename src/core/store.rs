//! Session-scoped shared state.
//!
//! The controller is the only writer. Observers take short read snapshots and
//! wait on a revision counter to learn that something changed; every update
//! replaces fields under the lock, so readers never see a half-applied edit.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::core::message::{ChatMessage, HistoryItem};
use crate::core::phase::ResponsePhase;

pub struct StoreHandle<T> {
    state: Arc<Mutex<T>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<T> Clone for StoreHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            revision: Arc::clone(&self.revision),
        }
    }
}

impl<T: Default> Default for StoreHandle<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> StoreHandle<T> {
    pub fn new(initial: T) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(initial)),
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut guard = self.lock();
            f(&mut guard)
        };
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
        result
    }

    /// Receiver that is marked changed after every [`StoreHandle::update`].
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Conversation state for the chat currently on screen.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub title: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub phase: Option<ResponsePhase>,
    /// True from prompt submission until the turn (and any video job) settles.
    pub workflow_running: bool,
    /// Prompt waiting for the next start-generation trigger.
    pub pending_prompt: String,
    pub start_generation: bool,
}

impl ChatState {
    /// Stage a prompt and raise the start-generation flag.
    pub fn queue_prompt(&mut self, prompt: impl Into<String>) {
        self.pending_prompt = prompt.into();
        self.start_generation = true;
    }

    /// Lower the start-generation flag and hand back the staged prompt.
    pub fn take_pending_prompt(&mut self) -> String {
        self.start_generation = false;
        std::mem::take(&mut self.pending_prompt)
    }

    pub fn set_messages(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }

    pub fn push_pending_turn(&mut self, prompt: &str) {
        self.messages.push(ChatMessage::pending(prompt));
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Leaving a chat: the list is replaced wholesale on the next open.
    pub fn clear_chat(&mut self) {
        self.title = None;
        self.messages.clear();
        self.phase = None;
        self.workflow_running = false;
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryState {
    pub items: Vec<HistoryItem>,
}

impl HistoryState {
    pub fn replace(&mut self, items: Vec<HistoryItem>) {
        self.items = items;
    }

    /// Put a freshly created chat at the top, dropping any stale entry for it.
    pub fn prepend(&mut self, item: HistoryItem) {
        self.items.retain(|existing| existing.id != item.id);
        self.items.insert(0, item);
    }
}

#[derive(Clone, Default)]
pub struct SessionStores {
    pub chat: StoreHandle<ChatState>,
    pub history: StoreHandle<HistoryState>,
}

impl SessionStores {
    pub fn new() -> Self {
        Self::default()
    }
}
