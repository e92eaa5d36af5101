// src/cli.rs

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Poll HubSpot project jobs (builds, deploys, sandbox syncs) until they finish.
///
/// `hspoll.yaml` is optional; CLI flags override its values.
#[derive(Parser, Debug)]
#[command(name = "hspoll", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    ///
    /// RUST_LOG takes precedence when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// All supported CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll a status URL until the job reaches a terminal status.
    ///
    /// Exits 0 on SUCCESS; non-zero on ERROR, FAILURE, REVERTED,
    /// a failed request, or Ctrl-C.
    Watch {
        /// Status URL, absolute or relative to api.base_url
        ///
        /// Example:
        /// /project-builds/v1/builds/42/status
        url: String,

        /// Path to config file
        #[arg(short, long, default_value = "hspoll.yaml")]
        config: PathBuf,

        /// Override delay between status checks in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Print poll events as JSON lines on stderr
        #[arg(long)]
        events: bool,
    },

    /// Fetch a status URL once and print the result.
    Status {
        /// Status URL, absolute or relative to api.base_url
        url: String,

        /// Path to config file
        #[arg(short, long, default_value = "hspoll.yaml")]
        config: PathBuf,
    },

    /// Write a default hspoll.yaml.
    Init {
        /// Where to write the config
        #[arg(short, long, default_value = "hspoll.yaml")]
        config: PathBuf,
    },
}
