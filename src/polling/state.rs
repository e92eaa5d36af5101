// src/polling/state.rs

//! Status vocabulary shared by the poller and the fetch functions that feed it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Recognised job statuses.
///
/// Only `SUCCESS`, `ERROR`, `FAILURE` and `REVERTED` end a poll session.
/// `STARTED` and any status string outside this set keep polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollingState {
    Started,
    Success,
    Error,
    Failure,
    Reverted,
}

impl PollingState {
    /// The whole vocabulary, in declaration order.
    pub const ALL: [PollingState; 5] = [
        PollingState::Started,
        PollingState::Success,
        PollingState::Error,
        PollingState::Failure,
        PollingState::Reverted,
    ];

    /// Statuses that end a session with a rejection.
    pub const TERMINAL_FAILURES: [PollingState; 3] = [
        PollingState::Error,
        PollingState::Failure,
        PollingState::Reverted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PollingState::Started => "STARTED",
            PollingState::Success => "SUCCESS",
            PollingState::Error => "ERROR",
            PollingState::Failure => "FAILURE",
            PollingState::Reverted => "REVERTED",
        }
    }

    /// Exact, case-sensitive match against the wire strings.
    ///
    /// Returns `None` for anything outside the vocabulary; callers treat
    /// that as non-terminal.
    pub fn parse(status: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == status)
    }

    pub fn is_success(self) -> bool {
        self == PollingState::Success
    }

    pub fn is_failure(self) -> bool {
        Self::TERMINAL_FAILURES.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        self.is_success() || self.is_failure()
    }
}

impl fmt::Display for PollingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything a fetch function can hand back to the poller.
pub trait PollStatus {
    fn status(&self) -> &str;

    /// The recognised state, if the status is part of the vocabulary.
    fn state(&self) -> Option<PollingState> {
        PollingState::parse(self.status())
    }
}

impl PollStatus for String {
    fn status(&self) -> &str {
        self
    }
}

impl PollStatus for &str {
    fn status(&self) -> &str {
        self
    }
}

/// Response wrapper returned by fetch functions, mirroring `{ "data": {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Untyped status body: a `status` string plus whatever else the API sent.
///
/// Example:
///
/// { "status": "SUCCESS", "buildId": 42 }
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub status: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StatusPayload {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl PollStatus for StatusPayload {
    fn status(&self) -> &str {
        &self.status
    }
}
