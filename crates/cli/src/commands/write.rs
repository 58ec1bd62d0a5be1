// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::{Map, Value};
use tether_session::{OptimisticWriter, Versioned};

use crate::cli::AssignArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::SessionStore;

use super::open_session;

/// Parses a command-line value as JSON, falling back to a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Applies the assignments to a stored value.
///
/// A value that is not an object is replaced by an empty object first.
pub fn apply(value: Value, assign: &AssignArgs) -> Value {
    let mut object = match value {
        Value::Object(object) => object,
        _ => Map::new(),
    };

    for (key, raw) in &assign.set {
        object.insert(key.clone(), parse_value(raw));
    }
    for (key, raw) in &assign.append {
        let entry = object.entry(key.clone()).or_insert(Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(parse_value(raw)),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, parse_value(raw)]);
            }
        }
    }
    for key in &assign.unset {
        object.remove(key);
    }

    Value::Object(object)
}

/// Writes `resource` through an optimistic writer over a session to `url`.
pub async fn update(
    url: &str,
    resource: &str,
    assign: AssignArgs,
    config: &Config,
) -> Result<Versioned> {
    if assign.set.is_empty() && assign.append.is_empty() && assign.unset.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to write: use --set, --append or --unset".to_string(),
        ));
    }

    let (session, _events) = open_session(url, &config.connection).await?;
    let writer = OptimisticWriter::new(SessionStore::new(session.clone()), config.writer.clone());

    let result = writer
        .update(resource, move |value: Value| apply(value, &assign))
        .await;

    session.disconnect().await;
    Ok(result?)
}

pub async fn run(url: &str, resource: &str, assign: AssignArgs, config: &Config) -> Result<()> {
    let written = update(url, resource, assign, config).await?;
    println!("{}", serde_json::to_string_pretty(&written)?);
    Ok(())
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
