// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;
use std::sync::Arc;

use tether_core::{into_result, PreparedRequest, Response, RetryConfig};
use tokio::runtime::Handle;
use tracing::debug;

use crate::cli::RequestArgs;
use crate::config::Config;
use crate::driver::SchedulerHandle;
use crate::error::{Error, Result};
use crate::transport::ReqwestRequest;

use super::http_client;

/// Builds the request described by `args`.
pub fn prepare(args: &RequestArgs) -> Result<PreparedRequest> {
    let mut prepared = PreparedRequest::new(args.method.to_uppercase(), &args.url);
    for (name, value) in &args.headers {
        prepared = prepared.header(name, value);
    }

    if args.json {
        let data = args.data.as_deref().unwrap_or("null");
        let value: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| Error::InvalidArgument(format!("--data is not valid JSON: {}", e)))?;
        prepared = prepared.json(&value)?;
    } else if let Some(data) = &args.data {
        prepared = prepared.body(data.as_bytes());
    }
    Ok(prepared)
}

/// Sends `prepared` through a retry scheduler and returns the final response.
pub async fn fetch(prepared: PreparedRequest, retry: &RetryConfig) -> Result<Response> {
    let client = http_client()?;
    let scheduler = SchedulerHandle::start(retry.clone());
    let request = Arc::new(ReqwestRequest::new(client, prepared, Handle::current()));

    let completion = scheduler.execute(request).await;
    scheduler.shutdown().await;

    let completion = completion?;
    debug!("{:?}", completion);
    Ok(into_result(&completion)?)
}

pub async fn run(args: RequestArgs, include: bool, config: &Config) -> Result<()> {
    let response = fetch(prepare(&args)?, &config.retry).await?;

    let mut out = std::io::stdout().lock();
    if include {
        write_head(&mut out, &response)?;
    }
    out.write_all(&response.body)?;
    out.flush()?;
    Ok(())
}

fn write_head(out: &mut impl Write, response: &Response) -> std::io::Result<()> {
    writeln!(out, "HTTP {}", response.status)?;
    for (name, value) in &response.headers {
        writeln!(out, "{}: {}", name, value)?;
    }
    writeln!(out)
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
