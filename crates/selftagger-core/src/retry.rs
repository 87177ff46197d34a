//! Bounded retry of whole attempts.
//!
//! ```text
//! Idle -> Running -> Succeeded
//!            |
//!            +-> Retrying -> Running ...
//!            |
//!            +-> Exhausted
//! ```
//!
//! Retries are immediate: the next attempt starts on the next turn of the
//! scheduler, from a loop rather than a nested call.

use tracing::Instrument;

use crate::domain::PublishReceipt;
use crate::obs;
use crate::pipeline::{Attempt, AttemptFailure};

/// Attempts made before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Where the controller is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running { attempt: u32 },
    Retrying { failed_attempt: u32 },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::Succeeded { .. } | ControllerState::Exhausted { .. }
        )
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum TerminalOutcome {
    Succeeded {
        attempts: u32,
        receipt: PublishReceipt,
    },
    Exhausted {
        attempts: u32,
        last_failure: AttemptFailure,
    },
}

impl TerminalOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TerminalOutcome::Succeeded { attempts, .. }
            | TerminalOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Runs an [`Attempt`] until it succeeds or the attempt budget is spent.
///
/// The attempt counter belongs to the controller instance, so independent
/// controllers never share state.
#[derive(Debug)]
pub struct RetryController {
    max_attempts: u32,
    attempts: u32,
    state: ControllerState,
    history: Vec<ControllerState>,
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryController {
    /// A budget of zero is treated as one.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempts: 0,
            state: ControllerState::Idle,
            history: vec![ControllerState::Idle],
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Attempts made in the current run.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Every state entered in the current run, starting with `Idle`.
    pub fn history(&self) -> &[ControllerState] {
        &self.history
    }

    fn transition(&mut self, next: ControllerState) {
        self.state = next;
        self.history.push(next);
    }

    /// Run `attempt` until success or exhaustion. A controller that already
    /// reached a terminal state starts a fresh run.
    pub async fn run_with_retry(&mut self, attempt: &dyn Attempt) -> TerminalOutcome {
        if self.state != ControllerState::Idle {
            self.attempts = 0;
            self.state = ControllerState::Idle;
            self.history = vec![ControllerState::Idle];
        }

        loop {
            let n = self.attempts + 1;
            self.transition(ControllerState::Running { attempt: n });
            obs::emit_attempt_started(n, self.max_attempts);

            let span = obs::attempt_span(n, self.max_attempts);
            let result = attempt.run().instrument(span).await;
            self.attempts = n;

            match result {
                Ok(receipt) => {
                    self.transition(ControllerState::Succeeded { attempts: n });
                    obs::emit_run_succeeded(n, &receipt);
                    return TerminalOutcome::Succeeded {
                        attempts: n,
                        receipt,
                    };
                }
                Err(failure) => {
                    obs::emit_attempt_failed(n, self.max_attempts, &failure);
                    if n >= self.max_attempts {
                        self.transition(ControllerState::Exhausted { attempts: n });
                        obs::emit_run_exhausted(n, &failure);
                        return TerminalOutcome::Exhausted {
                            attempts: n,
                            last_failure: failure,
                        };
                    }
                    self.transition(ControllerState::Retrying { failed_attempt: n });
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
