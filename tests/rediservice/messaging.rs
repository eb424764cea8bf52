//! Publishing, pattern-matched delivery and unsubscribe.

use std::sync::mpsc;

use rediservice::store::{Connector, PubSub};
use rediservice::{Bus, BusError, MemoryConnector, MemoryServer, Pattern, StoreConfig};
use serde_json::json;

use crate::support::{collect, TestBus, QUIET, WAIT};

fn bus_on(server: &MemoryServer) -> TestBus {
    Bus::with_memory(server.clone(), StoreConfig::testing()).unwrap()
}

// ============================================================================
// Send
// ============================================================================

#[test]
fn send_rejects_non_mapping_data() {
    let server = MemoryServer::new();
    let bus = bus_on(&server);
    let everything = collect(&bus, "ch", Pattern::any());

    for data in [json!("text"), json!([1, 2]), json!(null), json!(3)] {
        let err = bus.send("ch", data, None).unwrap_err();
        assert!(matches!(err, BusError::InvalidArgument(_)));
    }
    let err = bus.send("ch", json!(true), None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument: \"data\" must be an object, not boolean"
    );

    assert!(everything.recv_timeout(QUIET).is_err());
}

#[test]
fn overrides_win_over_data() {
    let bus = Bus::in_memory().unwrap();
    let received = collect(&bus, "ch", Pattern::any());

    bus.send(
        "ch",
        json!({ "a": 1, "b": 2 }),
        Some(json!({ "b": 3, "c": 4 })),
    )
    .unwrap();

    let message = received.recv_timeout(WAIT).unwrap();
    assert_eq!(serde_json::Value::Object(message), json!({ "a": 1, "b": 3, "c": 4 }));
}

#[test]
fn non_mapping_overrides_are_ignored() {
    let bus = Bus::in_memory().unwrap();
    let received = collect(&bus, "ch", Pattern::any());

    bus.send("ch", json!({ "a": 1 }), Some(json!("ignored"))).unwrap();

    let message = received.recv_timeout(WAIT).unwrap();
    assert_eq!(serde_json::Value::Object(message), json!({ "a": 1 }));
}

// ============================================================================
// Pattern-matched delivery
// ============================================================================

#[test]
fn every_matching_handler_fires() {
    let bus = Bus::in_memory().unwrap();
    let requests = collect(&bus, "ch", Pattern::new().present("words").absent("result"));
    let results = collect(&bus, "ch", Pattern::new().present("result"));
    let all = collect(&bus, "ch", Pattern::any());

    bus.send("ch", json!({ "words": ["x"] }), None).unwrap();

    assert!(requests.recv_timeout(WAIT).is_ok());
    assert!(all.recv_timeout(WAIT).is_ok());
    assert!(results.recv_timeout(QUIET).is_err());
}

#[test]
fn equal_to_requires_the_value() {
    let bus = Bus::in_memory().unwrap();
    let errors = collect(&bus, "ch", Pattern::new().equal_to("status", "error"));

    bus.send("ch", json!({ "status": "ok" }), None).unwrap();
    bus.send("ch", json!({ "status": "error", "n": 2 }), None).unwrap();

    let message = errors.recv_timeout(WAIT).unwrap();
    assert_eq!(message["n"], json!(2));
    assert!(errors.recv_timeout(QUIET).is_err());
}

#[test]
fn falsy_values_are_present() {
    let bus = Bus::in_memory().unwrap();
    let received = collect(&bus, "ch", Pattern::new().present("n"));

    bus.send("ch", json!({ "n": 0 }), None).unwrap();
    bus.send("ch", json!({ "n": null }), None).unwrap();
    bus.send("ch", json!({ "n": "" }), None).unwrap();

    assert_eq!(received.recv_timeout(WAIT).unwrap()["n"], json!(0));
    assert_eq!(received.recv_timeout(WAIT).unwrap()["n"], json!(""));
    assert!(received.recv_timeout(QUIET).is_err());
}

#[test]
fn on_value_builds_the_pattern() {
    let bus = Bus::in_memory().unwrap();
    let (tx, rx) = mpsc::channel();
    bus.on_value(
        "ch",
        &json!({ "words": true, "result": false, "kind": "join" }),
        move |ctx| tx.send(ctx.data().clone()).map_err(BusError::handler),
    )
    .unwrap();

    bus.send("ch", json!({ "words": [], "kind": "caps" }), None).unwrap();
    bus.send("ch", json!({ "words": [], "kind": "join", "result": "" }), None)
        .unwrap();
    bus.send("ch", json!({ "words": [], "kind": "join" }), None).unwrap();

    let message = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(message["kind"], json!("join"));
    assert!(!message.contains_key("result"));
    assert!(rx.recv_timeout(QUIET).is_err());
}

#[test]
fn on_value_rejects_non_mapping_patterns() {
    let bus = Bus::in_memory().unwrap();
    let err = bus.on_value("ch", &json!(["words"]), |_| Ok(())).unwrap_err();
    assert!(matches!(err, BusError::InvalidArgument(_)));
    assert!(bus.channels().subscribed().is_empty());
}

// ============================================================================
// Failures in delivery
// ============================================================================

#[test]
fn non_mapping_payload_counts_as_failure() {
    let bus = Bus::in_memory().unwrap();
    let (tx, rx) = mpsc::channel();
    bus.on("ch", move |ctx| tx.send(ctx.data().clone()).map_err(BusError::handler))
        .unwrap();

    bus.channels().publish("ch", &json!("plain")).unwrap();
    assert!(rx.recv_timeout(QUIET).is_err());

    let stats = bus.unsubscribe("ch").unwrap().unwrap();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.delivered, 0);
}

#[test]
fn malformed_frame_arrives_as_error_message() {
    let server = MemoryServer::new();
    let bus = bus_on(&server);
    let errors = collect(&bus, "ch", Pattern::new().present("error"));

    let raw = MemoryConnector::new(server, StoreConfig::testing())
        .connect()
        .unwrap();
    raw.publish("ch", "__json__:{oops").unwrap();

    let message = errors.recv_timeout(WAIT).unwrap();
    assert!(message["error"].as_str().unwrap().contains("malformed"));
}

#[test]
fn handler_error_does_not_stop_others() {
    let bus = Bus::in_memory().unwrap();
    bus.on("ch", |_| Err(BusError::handler("boom"))).unwrap();
    let received = collect(&bus, "ch", Pattern::any());

    bus.send("ch", json!({ "n": 1 }), None).unwrap();
    bus.send("ch", json!({ "n": 2 }), None).unwrap();

    assert_eq!(received.recv_timeout(WAIT).unwrap()["n"], json!(1));
    assert_eq!(received.recv_timeout(WAIT).unwrap()["n"], json!(2));

    let stats = bus.unsubscribe("ch").unwrap().unwrap();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.delivered, 2);
}

// ============================================================================
// Unsubscribe
// ============================================================================

#[test]
fn unsubscribe_stops_delivery() {
    let server = MemoryServer::new();
    let bus = bus_on(&server);
    let received = collect(&bus, "ch", Pattern::any());

    bus.send("ch", json!({ "n": 1 }), None).unwrap();
    assert!(received.recv_timeout(WAIT).is_ok());

    assert!(bus.unsubscribe("ch").unwrap().is_some());
    assert_eq!(server.subscriber_count("ch"), 0);

    bus.send("ch", json!({ "n": 2 }), None).unwrap();
    assert!(received.recv_timeout(QUIET).is_err());
    assert!(bus.unsubscribe("ch").unwrap().is_none());
}

#[test]
fn dropping_the_bus_unsubscribes() {
    let server = MemoryServer::new();
    let bus = bus_on(&server);
    bus.on("a", |_| Ok(())).unwrap();
    bus.on("b", |_| Ok(())).unwrap();
    assert_eq!(server.subscriber_count("a"), 1);

    drop(bus);
    assert_eq!(server.subscriber_count("a"), 0);
    assert_eq!(server.subscriber_count("b"), 0);
}

#[test]
fn handler_can_unsubscribe_its_own_channel() {
    let bus = Bus::in_memory().unwrap();
    let (tx, rx) = mpsc::channel();
    bus.on("once", move |ctx| {
        ctx.bus().unsubscribe(ctx.channel())?;
        tx.send(()).map_err(BusError::handler)
    })
    .unwrap();

    bus.send("once", json!({}), None).unwrap();
    assert!(rx.recv_timeout(WAIT).is_ok());
    assert!(bus.channels().subscribed().is_empty());
}

#[test]
fn sending_to_more_channels_than_the_pool_holds() {
    let server = MemoryServer::new();
    let bus = Bus::with_memory(server, StoreConfig::testing().with_pool_size(4)).unwrap();
    let last = collect(&bus, "reply.8", Pattern::any());

    for n in 0..=8 {
        bus.send(&format!("reply.{n}"), json!({ "n": n }), None).unwrap();
    }
    bus.channels().unsubscribe_all().unwrap();
    bus.send("reply.9", json!({ "n": 9 }), None).unwrap();

    assert_eq!(last.recv_timeout(WAIT).unwrap()["n"], json!(8));
}
