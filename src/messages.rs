// src/messages.rs

//! User-facing CLI copy.
//!
//! Every line the CLI prints to a human is one variant here, with its
//! parameters typed. Command code never formats prose inline.

use std::fmt;
use std::path::Path;

use crate::polling::PollingState;

#[derive(Debug)]
pub enum Message<'a> {
    WatchStarted { url: &'a str, delay_ms: u64 },
    JobSucceeded { attempts: usize },
    JobFailed { status: &'a str },
    FetchFailed { url: &'a str },
    Cancelled,
    MissingToken { env: &'a str },
    StatusReport { status: &'a str },
    ConfigCreated { path: &'a Path },
    ConfigExists { path: &'a Path },
}

impl fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::WatchStarted { url, delay_ms } => {
                write!(f, "Polling {} every {}ms", url, delay_ms)
            }
            Message::JobSucceeded { attempts } => {
                let plural = if *attempts == 1 { "" } else { "s" };
                write!(f, "Job succeeded after {} check{}", attempts, plural)
            }
            Message::JobFailed { status } => write!(f, "Job finished with status {}", status),
            Message::FetchFailed { url } => write!(f, "Could not fetch job status from {}", url),
            Message::Cancelled => f.write_str("Polling cancelled; the remote job may still be running"),
            Message::MissingToken { env } => write!(
                f,
                "WARNING: {} is not set; requesting status without an access token",
                env
            ),
            Message::StatusReport { status } => {
                write!(f, "Status {} ({})", status, describe_status(status))
            }
            Message::ConfigCreated { path } => write!(f, "Created {}", path.display()),
            Message::ConfigExists { path } => {
                write!(f, "{} already exists (refusing to overwrite)", path.display())
            }
        }
    }
}

fn describe_status(status: &str) -> &'static str {
    match PollingState::parse(status) {
        Some(PollingState::Success) => "succeeded",
        Some(state) if state.is_failure() => "failed",
        Some(_) => "in progress",
        None => "unrecognised, treated as in progress",
    }
}
