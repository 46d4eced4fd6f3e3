//! Out-of-band completion polling for queued video jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{BackendApi, JobStatus, StatusResponse};
use crate::core::events::{EventSink, PollOutcome};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until a terminal status or cancellation.
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Maps one status reply to a terminal outcome, or `None` to keep polling.
///
/// A missing status record counts as success: the backend clears the running
/// job once it finishes.
pub fn classify_status(status: Option<&StatusResponse>) -> Option<PollOutcome> {
    match status.map(|status| status.status) {
        None | Some(JobStatus::Completed) => Some(PollOutcome::Completed),
        Some(JobStatus::Failed) => Some(PollOutcome::Failed(
            status.and_then(|status| status.error.clone()),
        )),
        Some(JobStatus::Queued) | Some(JobStatus::Processing) => None,
    }
}

pub struct CompletionPoller {
    settings: PollSettings,
    /// Cancels the spawned poll task; `Some` while a poll is pending.
    active: Option<CancellationToken>,
}

impl CompletionPoller {
    pub fn new(settings: PollSettings) -> Self {
        Self {
            settings,
            active: None,
        }
    }

    /// True from `start` until `stop`. A task that has already emitted its
    /// outcome stays pending until its owner has handled it and stopped the
    /// poller.
    pub fn is_pending(&self) -> bool {
        self.active.is_some()
    }

    /// Spawn the poll loop. Returns false, without spawning, when one is
    /// already pending.
    pub fn start(&mut self, api: Arc<dyn BackendApi>, sink: EventSink) -> bool {
        if self.is_pending() {
            debug!("completion poller already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let settings = self.settings;
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                outcome = poll_until_terminal(api.as_ref(), settings) => {
                    sink.emit(outcome);
                }
                _ = token.cancelled() => {
                    debug!("completion poller cancelled");
                }
            }
        });
        self.active = Some(cancel);
        true
    }

    pub fn stop(&mut self) {
        if let Some(cancel) = self.active.take() {
            cancel.cancel();
        }
    }
}

impl Drop for CompletionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_until_terminal(api: &dyn BackendApi, settings: PollSettings) -> PollOutcome {
    let mut ticker = interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;

    loop {
        ticker.tick().await;
        attempts += 1;

        match api.status().await {
            Ok(status) => {
                if let Some(outcome) = classify_status(status.as_ref()) {
                    debug!(attempts, ?outcome, "completion poll finished");
                    return outcome;
                }
            }
            Err(err) => warn!("status poll failed: {err}"),
        }

        if settings
            .max_attempts
            .is_some_and(|max_attempts| attempts >= max_attempts)
        {
            return PollOutcome::Exhausted { attempts };
        }
    }
}
