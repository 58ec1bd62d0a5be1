// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether - reliable delivery from the command line.
//!
//! This crate wires the tick-driven components of `tether-core` and
//! `tether-session` to real I/O:
//!
//! - [`transport::ReqwestRequest`] executes prepared HTTP requests with reqwest
//! - [`driver::SchedulerHandle`] ticks a retry scheduler on a tokio task
//! - [`driver::SessionHandle`] ticks a WebSocket session on a tokio task
//! - [`store::SessionStore`] is a shared store spoken over a session
//!
//! Settings come from a TOML [`Config`]; see [`config`] for the lookup order.

mod cli;
mod commands;

pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod logging;
pub mod store;
pub mod transport;

#[cfg(test)]
mod test_http;
#[cfg(test)]
mod test_server;

pub use cli::{AssignArgs, Cli, Command, RequestArgs};
pub use config::Config;
pub use error::{Error, Result};

/// Runs a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Fetch { request, include } => commands::fetch::run(request, include, &config).await,
        Command::Listen { url, count } => commands::listen::run(&url, count, &config).await,
        Command::Write {
            url,
            resource,
            assign,
        } => commands::write::run(&url, &resource, assign, &config).await,
        Command::Batch { url, file } => commands::batch::run(&url, &file, &config).await,
        Command::Config { save } => commands::config::run(&config, save.as_deref()),
    }
}
