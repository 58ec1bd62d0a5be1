// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file management.
//!
//! Configuration is read from a TOML file with one table per component:
//!
//! ```toml
//! [retry]
//! initial_delay_ms = 1000
//! total_timeout_ms = 60000
//!
//! [connection]
//! ping_interval_ms = 30000
//!
//! [writer]
//! max_attempts = 3
//!
//! [batch]
//! interval_ms = 60000
//! immediate = ["crash"]
//! ```
//!
//! Every table and key is optional. The file is looked up in this order:
//! `--config <path>`, `$TETHER_CONFIG`, then `./tether.toml`. With no file
//! the defaults apply.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tether_core::{BatchConfig, RetryConfig};
use tether_session::{ConnectionConfig, WriterConfig};

use crate::env;
use crate::error::{Error, Result};

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "tether.toml";

/// Settings for every component, as stored in `tether.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Retry scheduler settings.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Connection state machine settings.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Optimistic writer settings.
    #[serde(default)]
    pub writer: WriterConfig,
    /// Event batching settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Resolves and loads the effective configuration.
    ///
    /// An explicit path must exist; the fallbacks may be absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = env::config_path() {
            return Self::load(&path);
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load(&local);
        }
        Ok(Config::default())
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))
    }

    /// Saves configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
