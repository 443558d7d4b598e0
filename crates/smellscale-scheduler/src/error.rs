//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur while applying a schedule entry.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("state store error: {0}")]
    State(#[from] smellscale_state::StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
