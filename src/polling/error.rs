// src/polling/error.rs

use thiserror::Error;

use crate::polling::state::PollStatus;

/// A poll delay of zero was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("poll delay must be greater than zero")]
pub struct InvalidDelay;

/// Why a poll session ended without a `SUCCESS` status.
///
/// `Terminal` carries the last payload so callers can report the specific
/// status. `Fetch` carries the fetch function's error untouched.
#[derive(Debug, Error)]
pub enum PollError<T: PollStatus, E> {
    #[error("job finished with status {}", .0.status())]
    Terminal(T),

    #[error("status fetch failed: {0}")]
    Fetch(E),

    #[error("polling was cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidDelay(#[from] InvalidDelay),
}

impl<T: PollStatus, E> PollError<T, E> {
    /// The payload of a terminal-failure status, if that is why polling stopped.
    pub fn terminal(&self) -> Option<&T> {
        match self {
            PollError::Terminal(data) => Some(data),
            _ => None,
        }
    }

    pub fn fetch_error(&self) -> Option<&E> {
        match self {
            PollError::Fetch(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PollError::Cancelled)
    }
}
