use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::isolation::InstanceMarker;

// ---------------------------------------------------------------------------
// WaitPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl WaitPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Success,
    Timeout,
}

// ---------------------------------------------------------------------------
// WaitState: one poll loop iteration per transition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Polling,
    FinalCheck,
    Done(WaitOutcome),
}

/// Waits for a running instance to remove its marker file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownWaiter {
    policy: WaitPolicy,
}

impl ShutdownWaiter {
    pub fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Poll until `marker` is gone or the timeout elapses.
    ///
    /// `on_progress` receives the whole seconds elapsed, at most once per
    /// second. When the timeout is reached the marker is checked one last
    /// time so a shutdown that lands between two polls is not reported as a
    /// timeout. There is no way to abandon the wait early.
    pub async fn wait<F>(&self, marker: &InstanceMarker, mut on_progress: F) -> WaitOutcome
    where
        F: FnMut(u64),
    {
        let start = Instant::now();
        let mut last_reported = 0;
        let mut state = WaitState::Polling;

        loop {
            state = match state {
                WaitState::Polling => {
                    if !marker.is_present() {
                        WaitState::Done(WaitOutcome::Success)
                    } else {
                        let elapsed = start.elapsed();
                        if elapsed >= self.policy.timeout {
                            WaitState::FinalCheck
                        } else {
                            let secs = elapsed.as_secs();
                            if secs > last_reported {
                                last_reported = secs;
                                on_progress(secs);
                            }
                            let remaining = self.policy.timeout - elapsed;
                            sleep(self.policy.poll_interval.min(remaining)).await;
                            WaitState::Polling
                        }
                    }
                }
                WaitState::FinalCheck => {
                    if marker.is_present() {
                        WaitState::Done(WaitOutcome::Timeout)
                    } else {
                        WaitState::Done(WaitOutcome::Success)
                    }
                }
                WaitState::Done(outcome) => {
                    debug!(
                        marker = %marker.path().display(),
                        ?outcome,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "shutdown wait finished"
                    );
                    return outcome;
                }
            };
        }
    }
}
