// src/lib.rs

//! hspoll
//!
//! Wait for remote HubSpot project jobs (builds, deploys, sandbox syncs) to
//! finish. The reusable piece is [`polling::Poller`]; the rest of the crate is
//! the thin CLI layer that feeds it an HTTP status fetch.

pub mod cli;
pub mod client;
pub mod config;
pub mod messages;
pub mod polling;
pub mod runner;
pub mod session_id;
pub mod sinks;
pub mod util;

pub use polling::{
    poll, poll_default, Envelope, PollError, PollStatus, Poller, PollingState, StatusPayload,
    DEFAULT_POLLING_DELAY,
};
