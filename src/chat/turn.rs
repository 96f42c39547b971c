//! Turn state machine and busy flag
//!
//! A turn moves `Idle -> Sending -> Streaming -> {Completed | Failed}`.
//! While a turn is `Sending` or `Streaming` the tracker is busy and refuses
//! to begin another one. The busy state is released by [`TurnGuard`] on
//! every exit path, including the turn's future being dropped.

use crate::error::{MedchatError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle state of the most recent turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No turn has run yet
    #[default]
    Idle,
    /// Request is being sent; no response yet
    Sending,
    /// Fragments are arriving
    Streaming,
    /// The response stream ended normally
    Completed,
    /// The turn ended with an error
    Failed,
}

impl TurnState {
    /// True while a turn is in flight
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::chat::TurnState;
    ///
    /// assert!(TurnState::Streaming.is_busy());
    /// assert!(!TurnState::Completed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnState::Sending | TurnState::Streaming)
    }

    /// True for `Completed` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Completed | TurnState::Failed)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnState::Idle => "idle",
            TurnState::Sending => "sending",
            TurnState::Streaming => "streaming",
            TurnState::Completed => "completed",
            TurnState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Shared view of the current turn state
///
/// Cloning yields another handle to the same state, so callers can observe
/// the busy flag while a turn runs.
#[derive(Debug, Clone, Default)]
pub struct TurnTracker {
    state: Arc<Mutex<TurnState>>,
}

impl TurnTracker {
    /// Create a tracker in the `Idle` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> TurnState {
        *self.lock()
    }

    /// True while a turn is `Sending` or `Streaming`
    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Start a turn, moving to `Sending`
    ///
    /// # Errors
    ///
    /// Returns [`MedchatError::Busy`] if a turn is already in flight.
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::chat::{TurnState, TurnTracker};
    ///
    /// let tracker = TurnTracker::new();
    /// let guard = tracker.begin().unwrap();
    /// assert!(tracker.is_busy());
    /// assert!(tracker.begin().is_err());
    ///
    /// guard.complete();
    /// assert_eq!(tracker.state(), TurnState::Completed);
    /// assert!(!tracker.is_busy());
    /// ```
    pub fn begin(&self) -> Result<TurnGuard> {
        let mut state = self.lock();
        if state.is_busy() {
            return Err(MedchatError::Busy.into());
        }
        let previous = *state;
        *state = TurnState::Sending;
        Ok(TurnGuard {
            tracker: self.clone(),
            previous,
            finished: false,
        })
    }

    fn set(&self, next: TurnState) {
        *self.lock() = next;
    }

    fn lock(&self) -> MutexGuard<'_, TurnState> {
        // The state is a plain enum; a poisoned lock still holds a valid value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Ownership of the in-flight turn
///
/// Must be finished with [`TurnGuard::complete`], [`TurnGuard::fail`], or
/// [`TurnGuard::cancel`]. Dropping it unfinished records `Failed`.
#[derive(Debug)]
#[must_use = "dropping the guard immediately ends the turn as failed"]
pub struct TurnGuard {
    tracker: TurnTracker,
    previous: TurnState,
    finished: bool,
}

impl TurnGuard {
    /// The first response has arrived; move to `Streaming`
    pub fn streaming(&self) {
        self.tracker.set(TurnState::Streaming);
    }

    /// End the turn as `Completed`
    pub fn complete(mut self) {
        self.finish(TurnState::Completed);
    }

    /// End the turn as `Failed`
    pub fn fail(mut self) {
        self.finish(TurnState::Failed);
    }

    /// Abandon a turn that never touched the transcript, restoring the prior state
    pub fn cancel(mut self) {
        let previous = self.previous;
        self.finish(previous);
    }

    fn finish(&mut self, state: TurnState) {
        self.tracker.set(state);
        self.finished = true;
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Turn ended without reaching a terminal state; marking it failed");
            self.tracker.set(TurnState::Failed);
        }
    }
}
