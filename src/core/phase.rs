//! Phase tracking over the raw response stream.
//!
//! The backend interleaves display text with three reserved frames. The
//! tracker turns that stream into the controller's belief about what the
//! backend is doing and tells the caller whether a frame carries text.

use memchr::memmem;

pub const DONE_SENTINEL: &str = "<done/>";
pub const FAILED_SENTINEL: &str = "<failed/>";
pub const QUEUED_SENTINEL: &str = "<queued/>";

/// Delimiter around the generation script embedded in the response.
pub const CODE_FENCE: &str = "```";

pub fn contains_fence(text: &str) -> bool {
    memmem::find(text.as_bytes(), CODE_FENCE.as_bytes()).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    Waiting,
    Writing,
    Coding,
    Generating,
}

impl ResponsePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponsePhase::Waiting => "waiting",
            ResponsePhase::Writing => "writing",
            ResponsePhase::Coding => "coding",
            ResponsePhase::Generating => "generating",
        }
    }

    /// Status line shown while the phase is active, if any.
    pub fn indicator(self) -> Option<&'static str> {
        match self {
            ResponsePhase::Waiting => Some("Thinking"),
            ResponsePhase::Writing => None,
            ResponsePhase::Coding => Some("Writing video script"),
            ResponsePhase::Generating => Some("Generating video"),
        }
    }

    /// True while text is still arriving over the socket.
    pub fn is_streaming(self) -> bool {
        matches!(
            self,
            ResponsePhase::Waiting | ResponsePhase::Writing | ResponsePhase::Coding
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Done,
    Failed,
    Queued,
}

impl Sentinel {
    /// Sentinels are exact frame matches; a sentinel embedded in text is text.
    pub fn parse(frame: &str) -> Option<Self> {
        match frame {
            DONE_SENTINEL => Some(Sentinel::Done),
            FAILED_SENTINEL => Some(Sentinel::Failed),
            QUEUED_SENTINEL => Some(Sentinel::Queued),
            _ => None,
        }
    }
}

/// What the caller should do with a frame after the tracker has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Display text; forward to message assembly.
    Append,
    /// The backend finished streaming.
    Done,
    /// The backend gave up on this turn.
    Failed,
    /// The job was queued. `start_poller` is false when a poller was already
    /// started for this turn.
    Queued { start_poller: bool },
}

impl FrameOutcome {
    pub fn should_append(self) -> bool {
        matches!(self, FrameOutcome::Append)
    }
}

#[derive(Debug, Default)]
pub struct PhaseTracker {
    phase: Option<ResponsePhase>,
    poller_started: bool,
    finished: bool,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Option<ResponsePhase> {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_some()
    }

    /// Start of a turn: the prompt has been sent.
    pub fn begin_turn(&mut self) {
        self.phase = Some(ResponsePhase::Waiting);
        self.poller_started = false;
        self.finished = false;
    }

    /// Re-enter the generating phase for a job discovered out of band.
    /// Returns whether a poller should be started.
    pub fn resume_generating(&mut self) -> bool {
        self.phase = Some(ResponsePhase::Generating);
        self.finished = false;
        !std::mem::replace(&mut self.poller_started, true)
    }

    pub fn reset(&mut self) {
        self.phase = None;
        self.poller_started = false;
        self.finished = false;
    }

    pub fn observe(&mut self, frame: &str) -> FrameOutcome {
        if self.finished {
            return match Sentinel::parse(frame) {
                Some(Sentinel::Done) => FrameOutcome::Done,
                Some(Sentinel::Failed) => FrameOutcome::Failed,
                Some(Sentinel::Queued) => self.queue(),
                None => FrameOutcome::Append,
            };
        }

        match self.phase {
            None => self.phase = Some(ResponsePhase::Waiting),
            Some(ResponsePhase::Waiting) => self.phase = Some(ResponsePhase::Writing),
            Some(_) => {}
        }

        if contains_fence(frame) {
            self.phase = Some(ResponsePhase::Coding);
            return FrameOutcome::Append;
        }

        match Sentinel::parse(frame) {
            Some(Sentinel::Done) => {
                self.phase = None;
                self.finished = true;
                FrameOutcome::Done
            }
            Some(Sentinel::Failed) => {
                self.phase = None;
                self.finished = true;
                FrameOutcome::Failed
            }
            Some(Sentinel::Queued) => self.queue(),
            None => FrameOutcome::Append,
        }
    }

    fn queue(&mut self) -> FrameOutcome {
        self.phase = Some(ResponsePhase::Generating);
        self.finished = false;
        let start_poller = !self.poller_started;
        self.poller_started = true;
        FrameOutcome::Queued { start_poller }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn() -> PhaseTracker {
        let mut tracker = PhaseTracker::new();
        tracker.begin_turn();
        tracker
    }

    #[test]
    fn first_fragment_of_fresh_tracker_enters_waiting() {
        let mut tracker = PhaseTracker::new();
        assert_eq!(tracker.observe("Hi"), FrameOutcome::Append);
        assert_eq!(tracker.phase(), Some(ResponsePhase::Waiting));
        tracker.observe(" there");
        assert_eq!(tracker.phase(), Some(ResponsePhase::Writing));
    }

    #[test]
    fn text_after_prompt_moves_waiting_to_writing() {
        let mut tracker = turn();
        assert_eq!(tracker.phase(), Some(ResponsePhase::Waiting));
        assert!(tracker.observe("Sure, ").should_append());
        assert_eq!(tracker.phase(), Some(ResponsePhase::Writing));
        assert!(tracker.observe("more").should_append());
        assert_eq!(tracker.phase(), Some(ResponsePhase::Writing));
    }

    #[test]
    fn fence_switches_to_coding_and_stays_appendable() {
        let mut tracker = turn();
        tracker.observe("Sure, ");
        assert_eq!(tracker.observe("```python\ncode"), FrameOutcome::Append);
        assert_eq!(tracker.phase(), Some(ResponsePhase::Coding));
        tracker.observe("print(1)");
        assert_eq!(tracker.phase(), Some(ResponsePhase::Coding));
    }

    #[test]
    fn done_returns_to_idle_and_is_not_appended() {
        let mut tracker = turn();
        tracker.observe("text");
        let outcome = tracker.observe(DONE_SENTINEL);
        assert_eq!(outcome, FrameOutcome::Done);
        assert!(!outcome.should_append());
        assert_eq!(tracker.phase(), None);
    }

    #[test]
    fn failed_returns_to_idle() {
        let mut tracker = turn();
        assert_eq!(tracker.observe(FAILED_SENTINEL), FrameOutcome::Failed);
        assert_eq!(tracker.phase(), None);
    }

    #[test]
    fn repeated_queued_requests_one_poller() {
        let mut tracker = turn();
        tracker.observe("```py");
        assert_eq!(
            tracker.observe(QUEUED_SENTINEL),
            FrameOutcome::Queued { start_poller: true }
        );
        assert_eq!(tracker.phase(), Some(ResponsePhase::Generating));
        assert_eq!(
            tracker.observe(QUEUED_SENTINEL),
            FrameOutcome::Queued {
                start_poller: false
            }
        );
    }

    #[test]
    fn new_turn_rearms_poller() {
        let mut tracker = turn();
        tracker.observe(QUEUED_SENTINEL);
        tracker.reset();
        tracker.begin_turn();
        assert_eq!(
            tracker.observe(QUEUED_SENTINEL),
            FrameOutcome::Queued { start_poller: true }
        );
    }

    #[test]
    fn resume_generating_only_once() {
        let mut tracker = PhaseTracker::new();
        assert!(tracker.resume_generating());
        assert_eq!(tracker.phase(), Some(ResponsePhase::Generating));
        assert!(!tracker.resume_generating());
        assert_eq!(
            tracker.observe(QUEUED_SENTINEL),
            FrameOutcome::Queued {
                start_poller: false
            }
        );
    }

    #[test]
    fn sentinel_inside_text_is_plain_text() {
        let mut tracker = turn();
        assert_eq!(tracker.observe("say <done/> please"), FrameOutcome::Append);
        assert_eq!(tracker.phase(), Some(ResponsePhase::Writing));
    }

    #[test]
    fn frames_after_done_do_not_restart_phases() {
        let mut tracker = turn();
        tracker.observe(DONE_SENTINEL);
        assert_eq!(tracker.observe("late"), FrameOutcome::Append);
        assert_eq!(tracker.phase(), None);
    }

    #[test]
    fn indicator_labels_match_phases() {
        assert_eq!(ResponsePhase::Waiting.indicator(), Some("Thinking"));
        assert_eq!(ResponsePhase::Writing.indicator(), None);
        assert!(!ResponsePhase::Generating.is_streaming());
        assert!(ResponsePhase::Coding.is_streaming());
    }
}
