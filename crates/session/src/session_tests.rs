// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::connection::ConnectionConfig;
use crate::test_helpers::MockNetwork;
use serde_json::json;
use tether_core::jitter::FixedJitter;

type Seen = Arc<Mutex<Vec<std::result::Result<Frame, SessionError>>>>;

fn recorder() -> (Seen, impl FnOnce(Result<Frame>) + Send + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |result| sink.lock().unwrap().push(result))
}

fn connected_session(now: Instant) -> (Session, MockNetwork) {
    let network = MockNetwork::new();
    let connection = Connection::with_jitter(
        ConnectionConfig::default(),
        network.factory(),
        FixedJitter(0.0),
    );
    let mut session = Session::new(connection);
    session.connect(now);
    network.open();
    assert_eq!(session.tick(now), vec![SessionEvent::Connected]);
    (session, network)
}

#[test]
fn request_resolves_with_response() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);
    let (seen, callback) = recorder();

    let id = session
        .request("partyInfoRequest", json!({}), callback, now)
        .unwrap();
    assert_eq!(session.pending(), 1);

    network.deliver(
        &Frame::new("partyInfoResponse", json!({"partyId": "p1"}))
            .with_id(id)
            .with_code(0),
    );
    assert!(session.tick(now).is_empty());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].as_ref().unwrap().payload, json!({"partyId": "p1"}));
    assert_eq!(session.pending(), 0);
}

#[test]
fn request_while_disconnected_fails_on_next_tick() {
    let network = MockNetwork::new();
    let mut session = Session::new(Connection::new(
        ConnectionConfig::default(),
        network.factory(),
    ));
    let (seen, callback) = recorder();

    assert_eq!(
        session.request("joinRequest", json!({}), callback, Instant::now()),
        None
    );
    assert!(seen.lock().unwrap().is_empty());

    session.tick(Instant::now());
    assert_eq!(*seen.lock().unwrap(), vec![Err(SessionError::NotConnected)]);
}

#[test]
fn connection_loss_fails_pending_requests() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);
    let (seen, callback) = recorder();
    session.request("joinRequest", json!({}), callback, now).unwrap();

    network.drop_connection();
    let events = session.tick(now);

    assert_eq!(
        events,
        vec![SessionEvent::Disconnected {
            code: 1006,
            reason: "reset".to_string()
        }]
    );
    assert_eq!(*seen.lock().unwrap(), vec![Err(SessionError::Disconnected)]);
    assert_eq!(session.state(), ConnectionState::Reconnecting);

    // A late response after reconnecting does not fire the callback again.
    session.tick(now + std::time::Duration::from_secs(1));
    network.open();
    session.tick(now + std::time::Duration::from_secs(1));
    network.deliver(&Frame::new("joinResponse", Value::Null).with_id("tether-1"));
    let events = session.tick(now + std::time::Duration::from_secs(2));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(matches!(events.as_slice(), [SessionEvent::Notification(_)]));
}

#[test]
fn graceful_close_fails_pending_requests() {
    let now = Instant::now();
    let (mut session, _network) = connected_session(now);
    let (seen, callback) = recorder();
    session.request("joinRequest", json!({}), callback, now).unwrap();

    session.disconnect();
    let events = session.tick(now);

    assert!(matches!(
        events.as_slice(),
        [SessionEvent::Closed {
            code: 1000,
            was_clean: true,
            ..
        }]
    ));
    assert_eq!(*seen.lock().unwrap(), vec![Err(SessionError::Disconnected)]);
}

#[test]
fn listeners_receive_notifications() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    session.listen("messageNotif", move |frame: &Frame| {
        sink.lock().unwrap().push(frame.payload.clone())
    });

    network.deliver(&Frame::new("messageNotif", json!("hello")));
    assert!(session.tick(now).is_empty());

    assert_eq!(*received.lock().unwrap(), vec![json!("hello")]);
}

#[test]
fn unlistened_frames_become_notification_events() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);

    network.deliver(&Frame::new(DISCONNECT_NOTIF, json!({"message": "maintenance"})));

    match session.tick(now).as_slice() {
        [SessionEvent::Notification(frame)] => assert_eq!(frame.kind, DISCONNECT_NOTIF),
        other => panic!("unexpected events {:?}", other),
    }
    assert!(session.is_connected());
}

#[test]
fn malformed_frame_is_reported_and_connection_stays_up() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);

    network.deliver_raw("garbage");
    network.deliver(&Frame::new("messageNotif", Value::Null));
    let events = session.tick(now);

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], SessionEvent::ParseError(_)));
    assert!(matches!(events[1], SessionEvent::Notification(_)));
    assert!(session.is_connected());
}

#[test]
fn poll_defers_callbacks() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);
    let (seen, callback) = recorder();
    let id = session.request("joinRequest", json!({}), callback, now).unwrap();

    network.deliver(&Frame::new("joinResponse", Value::Null).with_id(id));
    let (events, deliveries) = session.poll(now);

    assert!(events.is_empty());
    assert_eq!(deliveries.len(), 1);
    assert!(seen.lock().unwrap().is_empty());

    for delivery in deliveries {
        delivery.fire();
    }
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn unanswered_request_times_out() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);
    let (seen, callback) = recorder();
    let id = session.request("joinRequest", json!({}), callback, now).unwrap();

    session.tick(now + Duration::from_millis(29_999));
    assert!(seen.lock().unwrap().is_empty());

    session.tick(now + Duration::from_secs(30));
    assert_eq!(*seen.lock().unwrap(), vec![Err(SessionError::Timeout)]);
    assert_eq!(session.pending(), 0);

    // A late response is no longer matched to the request.
    network.deliver(&Frame::new("joinResponse", Value::Null).with_id(id));
    let events = session.tick(now + Duration::from_secs(31));
    assert!(matches!(events.as_slice(), [SessionEvent::Notification(_)]));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn answered_request_does_not_time_out() {
    let now = Instant::now();
    let (mut session, network) = connected_session(now);
    let (seen, callback) = recorder();
    let id = session.request("joinRequest", json!({}), callback, now).unwrap();

    network.deliver(&Frame::new("joinResponse", Value::Null).with_id(id));
    session.tick(now + Duration::from_secs(1));
    session.tick(now + Duration::from_secs(60));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_ok());
}

#[test]
fn zero_response_timeout_waits_indefinitely() {
    let now = Instant::now();
    let (mut session, _network) = connected_session(now);
    session.connection_mut().set_config(ConnectionConfig {
        response_timeout_ms: 0,
        ping_interval_ms: 0,
        ..ConnectionConfig::default()
    });
    let (seen, callback) = recorder();
    session.request("joinRequest", json!({}), callback, now).unwrap();

    session.tick(now + Duration::from_secs(3_600));

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(session.pending(), 1);
}
