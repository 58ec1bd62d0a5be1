// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// Print the effective configuration, optionally saving it to `save`.
pub fn run(config: &Config, save: Option<&Path>) -> Result<()> {
    print!("{}", config.to_toml()?);
    if let Some(path) = save {
        config.save(path)?;
        eprintln!("saved {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
