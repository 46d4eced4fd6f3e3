//! The chat session controller.
//!
//! A controller lives for as long as one chat id is open. It is the only
//! writer of the chat store: it appends the optimistic turn, drives the socket,
//! feeds inbound frames through phase tracking and message assembly, runs the
//! completion poller, and guarantees cleanup on every failure path so the
//! store never keeps reporting a generation that is no longer happening.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, BackendApi};
use crate::core::assembly::MessageAssembler;
use crate::core::events::{EventSink, PollOutcome, SessionEvent, SessionNotice, TransportEvent};
use crate::core::phase::{FrameOutcome, PhaseTracker, ResponsePhase};
use crate::core::poller::{CompletionPoller, PollSettings};
use crate::core::store::SessionStores;
use crate::core::transport::{Transport, TransportError};

pub const GENERATION_FAILED_MESSAGE: &str = "Video generation failed";
pub const GENERATION_TIMED_OUT_MESSAGE: &str = "Video generation timed out";
pub const SEND_FAILED_MESSAGE: &str = "Failed to send message. Please try again.";
pub const CONNECTION_ERROR_MESSAGE: &str = "An error occurred.";

#[derive(Debug)]
pub enum SessionError {
    /// A turn is already in flight for this session.
    Busy,
    Transport(TransportError),
    Api(ApiError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Busy => write!(f, "A generation is already in progress"),
            SessionError::Transport(err) => write!(f, "{err}"),
            SessionError::Api(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Busy => None,
            SessionError::Transport(err) => Some(err),
            SessionError::Api(err) => Some(err),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(value: TransportError) -> Self {
        SessionError::Transport(value)
    }
}

impl From<ApiError> for SessionError {
    fn from(value: ApiError) -> Self {
        SessionError::Api(value)
    }
}

/// How [`SessionController::open`] brought the chat on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A queued prompt was submitted.
    Generating,
    /// Messages were loaded; `resumed` is true when a running job for this
    /// chat was picked up again.
    Loaded { resumed: bool },
    /// Nothing to do: the prompt was blank or a workflow was already running.
    Skipped,
}

pub struct SessionController {
    chat_id: String,
    stores: SessionStores,
    api: Arc<dyn BackendApi>,
    transport: Box<dyn Transport>,
    tracker: PhaseTracker,
    assembler: MessageAssembler,
    poller: CompletionPoller,
    inbox_tx: mpsc::UnboundedSender<(SessionEvent, u64)>,
    inbox: mpsc::UnboundedReceiver<(SessionEvent, u64)>,
    generation: u64,
    notices: mpsc::UnboundedSender<SessionNotice>,
}

impl SessionController {
    pub fn new(
        chat_id: impl Into<String>,
        stores: SessionStores,
        api: Arc<dyn BackendApi>,
        transport: Box<dyn Transport>,
        poll_settings: PollSettings,
        notices: mpsc::UnboundedSender<SessionNotice>,
    ) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            chat_id: chat_id.into(),
            stores,
            api,
            transport,
            tracker: PhaseTracker::new(),
            assembler: MessageAssembler::new(),
            poller: CompletionPoller::new(poll_settings),
            inbox_tx,
            inbox,
            generation: 0,
            notices,
        }
    }

    pub fn stores(&self) -> &SessionStores {
        &self.stores
    }

    pub fn phase(&self) -> Option<ResponsePhase> {
        self.tracker.phase()
    }

    /// True from the poller's start until its outcome has been handled.
    pub fn is_polling(&self) -> bool {
        self.poller.is_pending()
    }

    /// True while a turn is streaming or a video job is being polled.
    pub fn is_active(&self) -> bool {
        self.tracker.is_active() || self.poller.is_pending()
    }

    /// Bring the chat on screen: submit the queued prompt when the
    /// start-generation flag is up, otherwise load its history.
    pub async fn open(&mut self) -> Result<OpenOutcome, SessionError> {
        let start_generation = self.stores.chat.read(|chat| chat.start_generation);
        if start_generation {
            return Ok(match self.start_generation().await? {
                true => OpenOutcome::Generating,
                false => OpenOutcome::Skipped,
            });
        }
        self.load_history().await
    }

    /// Submit the staged prompt. Returns false when there was nothing to
    /// submit.
    pub async fn start_generation(&mut self) -> Result<bool, SessionError> {
        if self.is_active() {
            return Err(SessionError::Busy);
        }

        let prompt = self.stores.chat.update(|chat| chat.take_pending_prompt());
        if prompt.trim().is_empty() {
            debug!("ignoring empty prompt");
            return Ok(false);
        }

        self.stores.chat.update(|chat| chat.push_pending_turn(&prompt));
        self.notify(SessionNotice::ScrollToTail);

        if let Err(err) = self.begin_stream(&prompt).await {
            warn!(chat_id = %self.chat_id, "failed to start generation: {err}");
            self.cleanup();
            self.transport.close().await;
            self.notify(SessionNotice::MessageSendFailed(
                SEND_FAILED_MESSAGE.to_string(),
            ));
            return Err(err.into());
        }
        Ok(true)
    }

    async fn begin_stream(&mut self, prompt: &str) -> Result<(), TransportError> {
        let sink = self.next_sink();
        self.transport.connect(&self.chat_id, sink.clone()).await?;
        self.transport.send(prompt).await?;
        self.tracker.begin_turn();
        self.assembler.reset();
        self.sync_phase();
        self.transport.set_on_message(sink)?;
        info!(chat_id = %self.chat_id, "prompt submitted");
        Ok(())
    }

    /// Fetch the chat's messages and resume polling if the backend is still
    /// rendering a video for it.
    pub async fn load_history(&mut self) -> Result<OpenOutcome, SessionError> {
        let busy = self.is_active() || self.stores.chat.read(|chat| chat.workflow_running);
        if busy {
            return Ok(OpenOutcome::Skipped);
        }

        let messages = self.api.messages(&self.chat_id).await?;
        self.stores.chat.update(|chat| chat.set_messages(messages));

        let status = match self.api.status().await {
            Ok(status) => status,
            Err(err) => {
                warn!("could not check for a running job: {err}");
                return Ok(OpenOutcome::Loaded { resumed: false });
            }
        };

        let resumed = status
            .as_ref()
            .is_some_and(|status| status.is_in_progress_for(&self.chat_id));
        if resumed {
            info!(chat_id = %self.chat_id, "resuming running video job");
            if self.tracker.resume_generating() {
                let sink = self.next_sink();
                self.poller.start(Arc::clone(&self.api), sink);
            }
            self.sync_phase();
        }
        Ok(OpenOutcome::Loaded { resumed })
    }

    /// Process events until no turn is streaming and no job is being polled,
    /// then close the socket.
    pub async fn run_until_idle(&mut self) {
        while self.is_active() {
            let Some((event, generation)) = self.inbox.recv().await else {
                break;
            };
            self.handle_event(event, generation).await;
        }
        self.transport.close().await;
    }

    /// Handle whatever is already queued without waiting for more.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok((event, generation)) = self.inbox.try_recv() {
            self.handle_event(event, generation).await;
            handled += 1;
        }
        handled
    }

    pub async fn handle_event(&mut self, event: SessionEvent, generation: u64) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale event");
            return;
        }
        match event {
            SessionEvent::Transport(TransportEvent::Frame(frame)) => self.handle_frame(&frame),
            SessionEvent::Transport(TransportEvent::Closed) => self.handle_close(),
            SessionEvent::Transport(TransportEvent::Errored(err)) => self.handle_socket_error(&err),
            SessionEvent::Poll(outcome) => self.handle_poll_outcome(outcome).await,
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        if !self.is_active() {
            debug!("dropping frame received outside a turn");
            return;
        }

        let outcome = self.tracker.observe(frame);
        match outcome {
            FrameOutcome::Append => {
                let phase = self.tracker.phase();
                let assembler = &mut self.assembler;
                self.stores.chat.update(|chat| {
                    assembler.append_to(&mut chat.messages, frame);
                    chat.phase = phase;
                });
            }
            FrameOutcome::Done => {
                debug!("response stream finished");
                self.sync_phase();
            }
            FrameOutcome::Failed => {
                self.cleanup();
                self.notify(SessionNotice::GenerationError(
                    GENERATION_FAILED_MESSAGE.to_string(),
                ));
            }
            FrameOutcome::Queued { start_poller } => {
                if start_poller {
                    let sink = EventSink::new(self.inbox_tx.clone(), self.generation);
                    self.poller.start(Arc::clone(&self.api), sink);
                }
                self.sync_phase();
            }
        }
    }

    /// A plain close is only a failure while the response is still streaming.
    /// Once the job is queued the poller carries the turn to completion.
    fn handle_close(&mut self) {
        match self.tracker.phase() {
            Some(phase) if phase.is_streaming() => {
                warn!(phase = phase.as_str(), "connection closed mid-turn");
                self.fail_connection();
            }
            _ => debug!("socket closed"),
        }
    }

    fn handle_socket_error(&mut self, reason: &str) {
        if self.is_active() {
            warn!("socket error during generation: {reason}");
            self.fail_connection();
        } else {
            debug!("socket error while idle: {reason}");
        }
    }

    fn fail_connection(&mut self) {
        self.cleanup();
        self.notify(SessionNotice::GenerationError(
            CONNECTION_ERROR_MESSAGE.to_string(),
        ));
    }

    async fn handle_poll_outcome(&mut self, outcome: PollOutcome) {
        self.cleanup();
        match outcome {
            PollOutcome::Completed => {
                self.notify(SessionNotice::VideoReceived);
                self.refresh_messages().await;
            }
            PollOutcome::Failed(detail) => {
                if let Some(detail) = detail {
                    warn!("video job failed: {detail}");
                }
                self.notify(SessionNotice::GenerationError(
                    GENERATION_FAILED_MESSAGE.to_string(),
                ));
            }
            PollOutcome::Exhausted { attempts } => {
                warn!(attempts, "gave up waiting for video job");
                self.notify(SessionNotice::GenerationError(
                    GENERATION_TIMED_OUT_MESSAGE.to_string(),
                ));
            }
        }
    }

    /// Replace the message list with the server's copy.
    pub async fn refresh_messages(&mut self) {
        match self.api.messages(&self.chat_id).await {
            Ok(messages) => self.stores.chat.update(|chat| chat.set_messages(messages)),
            Err(err) => warn!("failed to refresh messages: {err}"),
        }
    }

    /// Clear every in-flight marker. Runs on all failure and completion paths.
    fn cleanup(&mut self) {
        self.tracker.reset();
        self.assembler.reset();
        self.poller.stop();
        self.sync_phase();
    }

    /// Leave the chat: stop polling, drop the socket and ignore anything
    /// still queued from them.
    pub async fn teardown(&mut self) {
        self.generation += 1;
        self.cleanup();
        self.transport.close().await;
    }

    fn next_sink(&mut self) -> EventSink {
        self.generation += 1;
        EventSink::new(self.inbox_tx.clone(), self.generation)
    }

    fn sync_phase(&self) {
        let phase = self.tracker.phase();
        let running = phase.is_some() || self.poller.is_pending();
        self.stores.chat.update(|chat| {
            chat.phase = phase;
            chat.workflow_running = running;
        });
    }

    fn notify(&self, notice: SessionNotice) {
        if self.notices.send(notice).is_err() {
            debug!("no listener for session notices");
        }
    }
}
