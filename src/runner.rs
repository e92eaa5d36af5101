// src/runner.rs

use crate::cli::{Cli, Command};
use crate::client::StatusClient;
use crate::config::{default_config_yaml, Config};
use crate::messages::Message;
use crate::polling::{NoopSink, PollError, PollEventSink, Poller, StatusPayload};
use crate::sinks::JsonLinesSink;
use crate::util::{ensure_parent_dir, resolve_url};

use anyhow::{bail, Context, Result};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Entry point from `main.rs`.
///
/// Each command builds its own poller, client and sink; nothing is shared
/// between invocations.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Watch {
            url,
            config,
            delay_ms,
            events,
        } => watch(url, config, delay_ms, events).await,

        Command::Status { url, config } => status_once(url, config).await,

        Command::Init { config } => init_config(&config),
    }
}

/* ---------------- watch ---------------- */

async fn watch(url: String, config: PathBuf, delay_ms: Option<u64>, events: bool) -> Result<()> {
    let cfg = Config::load_or_default(&config)?;

    // CLI overrides
    let delay_ms = delay_ms.unwrap_or(cfg.polling.delay_ms);
    let poller = Poller::from_millis(delay_ms)
        .context("Poll delay must be greater than zero (check --delay-ms or polling.delay_ms)")?;

    let target = resolve_url(cfg.api.base_url.as_deref(), &url)?;
    let client = build_client(&cfg)?;

    eprintln!(
        "{}",
        Message::WatchStarted {
            url: &target,
            delay_ms,
        }
    );

    let mut sink: Box<dyn PollEventSink> = if events {
        Box::new(JsonLinesSink::stderr())
    } else {
        Box::new(NoopSink)
    };

    let attempts = Cell::new(0usize);
    let fetch = {
        let (client, target, attempts) = (&client, target.as_str(), &attempts);
        move || {
            attempts.set(attempts.get().saturating_add(1));
            client.fetch(target)
        }
    };

    let outcome = poller
        .poll_until_observed(fetch, shutdown_signal(), sink.as_mut())
        .await;

    report_outcome(outcome, &target, attempts.get())
}

/// Translate a finished poll session into CLI output and an exit status.
fn report_outcome(
    outcome: Result<StatusPayload, PollError<StatusPayload, anyhow::Error>>,
    url: &str,
    attempts: usize,
) -> Result<()> {
    match outcome {
        Ok(data) => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            eprintln!("{}", Message::JobSucceeded { attempts });
            Ok(())
        }
        Err(PollError::Terminal(data)) => {
            println!("{}", serde_json::to_string_pretty(&data)?);
            bail!("{}", Message::JobFailed { status: &data.status })
        }
        Err(PollError::Fetch(e)) => Err(e.context(Message::FetchFailed { url }.to_string())),
        Err(PollError::Cancelled) => bail!("{}", Message::Cancelled),
        Err(PollError::InvalidDelay(e)) => Err(e.into()),
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C; polling cannot be interrupted");
        std::future::pending::<()>().await;
    }
}

/* ---------------- status ---------------- */

async fn status_once(url: String, config: PathBuf) -> Result<()> {
    let cfg = Config::load_or_default(&config)?;
    let target = resolve_url(cfg.api.base_url.as_deref(), &url)?;
    let client = build_client(&cfg)?;

    let envelope = client
        .fetch(&target)
        .await
        .with_context(|| Message::FetchFailed { url: &target }.to_string())?;

    println!("{}", serde_json::to_string_pretty(&envelope.data)?);
    eprintln!(
        "{}",
        Message::StatusReport {
            status: &envelope.data.status
        }
    );
    Ok(())
}

/* ---------------- init ---------------- */

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{}", Message::ConfigExists { path });
    }

    ensure_parent_dir(path)?;
    std::fs::write(path, default_config_yaml())
        .with_context(|| format!("Failed to write {:?}", path))?;

    eprintln!("{}", Message::ConfigCreated { path });
    Ok(())
}

/* ---------------- utilities ---------------- */

fn build_client(cfg: &Config) -> Result<StatusClient> {
    let token = cfg.token();
    if token.is_none() {
        eprintln!(
            "{}",
            Message::MissingToken {
                env: &cfg.api.token_env
            }
        );
    }

    StatusClient::new(token.as_deref(), Duration::from_secs(cfg.api.timeout_secs))
}
