//! Stream consumer: one outbound exchange per user turn
//!
//! This module folds a provider's fragment stream into the transcript and
//! tracks the turn state machine that guards against overlapping turns.

pub mod consumer;
pub mod turn;

pub use consumer::{failure_text, StreamConsumer, TurnOutcome, FAILURE_PREFIX};
pub use turn::{TurnGuard, TurnState, TurnTracker};
