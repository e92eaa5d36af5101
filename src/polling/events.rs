use crate::session_id::SessionId;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollOutcome {
    Resolved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollEventKind {
    SessionStarted { delay_ms: u64 },
    AttemptStarted,
    AttemptFinished { status: String },
    FetchFailed,
    Settled { outcome: PollOutcome },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollEvent {
    pub session_id: SessionId,
    /// 1-based attempt number; 0 before the first fetch.
    pub attempt: u64,
    pub kind: PollEventKind,
    pub timestamp: SystemTime,
}

impl PollEvent {
    pub fn new(session_id: &SessionId, attempt: u64, kind: PollEventKind) -> Self {
        Self {
            session_id: session_id.clone(),
            attempt,
            kind,
            timestamp: SystemTime::now(),
        }
    }
}
