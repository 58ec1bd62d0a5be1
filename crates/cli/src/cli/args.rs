// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Argument structs and value parsers shared by commands.

use clap::Args;

/// An HTTP request described on the command line.
#[derive(Args, Clone, Debug, Default)]
pub struct RequestArgs {
    /// Request URL
    #[arg(value_parser = super::non_empty_string)]
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Header as "Name: value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Send the body as JSON (sets Content-Type and Accept)
    #[arg(long)]
    pub json: bool,
}

/// Field assignments applied to a stored JSON object.
#[derive(Args, Clone, Debug, Default)]
pub struct AssignArgs {
    /// Set a field, as key=value (repeatable)
    #[arg(long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Append to an array field, as key=value (repeatable)
    #[arg(long = "append", value_parser = parse_assignment)]
    pub append: Vec<(String, String)>,

    /// Remove a field (repeatable)
    #[arg(long = "unset")]
    pub unset: Vec<String>,
}

/// Parse a "Name: value" header.
pub fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name cannot be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse a "key=value" assignment.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    if key.trim().is_empty() {
        return Err("key cannot be empty".to_string());
    }
    Ok((key.trim().to_string(), value.to_string()))
}
