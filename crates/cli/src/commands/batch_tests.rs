// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use serde_json::json;
use tether_core::{BatchConfig, RetryConfig};
use yare::parameterized;

use super::*;
use crate::test_http::HttpServer;

fn config() -> Config {
    Config {
        retry: RetryConfig {
            initial_delay_ms: 10,
            max_delay_ms: 20,
            total_timeout_ms: 500,
            tick_interval_ms: 5,
            flush_timeout_ms: 0,
        },
        batch: BatchConfig {
            immediate: vec!["crash".to_string()],
            ..BatchConfig::default()
        },
        ..Config::default()
    }
}

#[parameterized(
    explicit = { json!({"kind": "click", "x": 1}), "click" },
    missing = { json!({"x": 1}), DEFAULT_KIND },
    not_a_string = { json!({"kind": 5}), DEFAULT_KIND },
    scalar = { json!(3), DEFAULT_KIND },
)]
fn kind_comes_from_kind_field(value: Value, expected: &str) {
    assert_eq!(Event(value).kind(), expected);
}

#[test]
fn blank_lines_are_skipped() {
    assert_eq!(parse_line(1, "   ").unwrap(), None);
    assert_eq!(
        parse_line(2, r#" {"kind":"a"} "#).unwrap(),
        Some(Event(json!({"kind": "a"})))
    );
}

#[test]
fn bad_line_names_its_number() {
    match parse_line(7, "{oops") {
        Err(Error::InvalidArgument(message)) => assert!(message.starts_with("line 7:")),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn events_are_batched_and_immediate_kinds_sent_alone() {
    let server = HttpServer::start(&[(200, "")]).await;
    let input = "{\"kind\":\"click\",\"n\":1}\n\n{\"kind\":\"crash\"}\n{\"kind\":\"click\",\"n\":2}\n";

    let summary = send_all(input.as_bytes(), &server.url(), &config())
        .await
        .unwrap();

    assert_eq!(
        summary,
        Summary {
            sent: 3,
            failed: 0,
            first_error: None
        }
    );
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    // The immediate request and the final flush race to the server.
    let mut bodies: Vec<Value> = requests
        .iter()
        .map(|r| serde_json::from_str(&r.body).unwrap())
        .collect();
    bodies.sort_by_key(|b| b.as_array().unwrap().len());
    assert_eq!(bodies[0], json!([{"kind": "crash"}]));
    assert_eq!(
        bodies[1],
        json!([{"kind": "click", "n": 1}, {"kind": "click", "n": 2}])
    );
    assert!(requests.iter().all(|r| r.method == "POST"));
    assert!(requests
        .iter()
        .all(|r| r.header("content-type") == Some("application/json")));
}

#[tokio::test]
async fn rejected_batch_fails_every_event() {
    let server = HttpServer::start(&[(400, "bad batch")]).await;
    let input = "{\"kind\":\"a\"}\n{\"kind\":\"b\"}\n";

    let summary = send_all(input.as_bytes(), &server.url(), &config())
        .await
        .unwrap();

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(
        summary.first_error,
        Some(RequestError::Http {
            status: 400,
            message: "bad batch".to_string()
        })
    );
}

#[tokio::test]
async fn malformed_input_is_an_error() {
    let server = HttpServer::start(&[(200, "")]).await;

    let result = send_all("{\"kind\":\"a\"}\nnope\n".as_bytes(), &server.url(), &config()).await;

    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}
