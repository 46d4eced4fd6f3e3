use tokio::sync::mpsc;

/// What the transport reports back to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Frame(String),
    /// The peer closed the connection (or the stream simply ended).
    Closed,
    Errored(String),
}

/// Terminal result of a completion poll run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed(Option<String>),
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Transport(TransportEvent),
    Poll(PollOutcome),
}

impl From<TransportEvent> for SessionEvent {
    fn from(value: TransportEvent) -> Self {
        SessionEvent::Transport(value)
    }
}

impl From<PollOutcome> for SessionEvent {
    fn from(value: PollOutcome) -> Self {
        SessionEvent::Poll(value)
    }
}

/// Sending half of the controller inbox, stamped with the generation that
/// created it so the controller can drop events from connections or pollers
/// it has already moved past.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<(SessionEvent, u64)>,
    generation: u64,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<(SessionEvent, u64)>, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Returns false once the controller is gone.
    pub fn emit(&self, event: impl Into<SessionEvent>) -> bool {
        self.tx.send((event.into(), self.generation)).is_ok()
    }
}

/// User-facing signals raised by the controller; the CLI's toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// A turn was appended; observers should bring the tail into view.
    ScrollToTail,
    VideoReceived,
    GenerationError(String),
    MessageSendFailed(String),
}
