// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use args::{AssignArgs, RequestArgs};

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reliable HTTP requests, persistent sessions and optimistic shared writes")]
#[command(
    long_about = "Reliable HTTP requests, persistent sessions and optimistic shared writes.\n\n\
    Requests are retried with exponential backoff, sessions reconnect on loss, \
    and shared values are written with version checks."
)]
pub struct Cli {
    /// Config file (default: $TETHER_CONFIG, then ./tether.toml)
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr (default: $TETHER_LOG_FILE)
    #[arg(long, global = true, value_name = "path")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send an HTTP request, retrying transient failures
    #[command(after_help = "\
Examples:
  tether fetch https://api.example.com/status
  tether fetch -X POST --json -d '{\"a\":1}' https://api.example.com/items
  tether fetch -H 'Authorization: Bearer t0k' https://api.example.com/me")]
    Fetch {
        #[command(flatten)]
        request: RequestArgs,

        /// Print the status line and headers before the body
        #[arg(short = 'i', long)]
        include: bool,
    },

    /// Connect to a session server and print notifications
    Listen {
        /// WebSocket URL
        #[arg(value_parser = non_empty_string)]
        url: String,

        /// Exit after this many notifications
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Update a shared resource with optimistic concurrency
    #[command(after_help = "\
Examples:
  tether write ws://localhost:9000 party-1 --set status=open
  tether write ws://localhost:9000 party-1 --append members='\"ada\"'")]
    Write {
        /// WebSocket URL
        #[arg(value_parser = non_empty_string)]
        url: String,

        /// Resource to update
        #[arg(value_parser = non_empty_string)]
        resource: String,

        #[command(flatten)]
        assign: AssignArgs,
    },

    /// Send newline-delimited JSON events in batches
    Batch {
        /// Endpoint receiving each batch as a JSON array
        #[arg(value_parser = non_empty_string)]
        url: String,

        /// File of JSON events, one per line ("-" for stdin)
        file: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to this file
        #[arg(long, value_name = "path")]
        save: Option<PathBuf>,
    },
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
