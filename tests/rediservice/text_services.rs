//! End-to-end text service scenarios.

use rediservice::{Bus, MemoryServer, Pattern, RunOptions, StoreConfig};
use serde_json::json;

use crate::support::{collect, register_text_services, TestBus, WAIT};

fn running_bus() -> TestBus {
    let bus = Bus::in_memory().unwrap();
    register_text_services(&bus);
    bus.run("text.join", &RunOptions::debug()).unwrap();
    bus.run("text.caps", &RunOptions::new()).unwrap();
    bus
}

// ============================================================================
// Join
// ============================================================================

#[test]
fn joins_a_list_of_words() {
    let bus = running_bus();
    let results = collect(&bus, "text.join", Pattern::new().present("result"));

    bus.send("text.join", json!({ "words": ["hello", "world"], "sep": " " }), None)
        .unwrap();

    let message = results.recv_timeout(WAIT).unwrap();
    assert_eq!(message["result"], json!("hello world"));
}

#[test]
fn result_is_merged_onto_the_request() {
    let bus = running_bus();
    let results = collect(&bus, "text.join", Pattern::new().present("result"));

    bus.send("text.join", json!({ "words": ["a", "b"], "id": 7 }), None)
        .unwrap();

    let message = results.recv_timeout(WAIT).unwrap();
    assert_eq!(message["result"], json!("ab"));
    assert_eq!(message["words"], json!(["a", "b"]));
    assert_eq!(message["id"], json!(7));
}

// ============================================================================
// Caps
// ============================================================================

#[test]
fn capitalizes_a_list_of_words() {
    let bus = running_bus();
    let results = collect(&bus, "text.caps", Pattern::new().present("result"));

    bus.send("text.caps", json!({ "words": ["hello", "world"] }), None)
        .unwrap();

    let message = results.recv_timeout(WAIT).unwrap();
    assert_eq!(message["result"], json!(["HELLO", "WORLD"]));
    assert_eq!(message["count"], json!(2));
}

#[test]
fn malformed_request_gets_no_result() {
    let bus = running_bus();
    let results = collect(&bus, "text.caps", Pattern::new().present("result"));

    bus.send("text.caps", json!({ "words": "not a list" }), None).unwrap();
    assert!(results.recv_timeout(crate::support::QUIET).is_err());

    let stats = bus.unsubscribe("text.caps").unwrap().unwrap();
    assert_eq!(stats.failed, 1);
}

#[test]
fn services_ignore_their_own_results() {
    let bus = running_bus();
    let results = collect(&bus, "text.caps", Pattern::new().present("result"));

    bus.send("text.caps", json!({ "words": ["x"] }), None).unwrap();
    results.recv_timeout(WAIT).unwrap();

    // The republished message has `result`, so the service must not fire again.
    assert!(results.recv_timeout(crate::support::QUIET).is_err());
}

// ============================================================================
// Across buses
// ============================================================================

#[test]
fn client_and_service_on_separate_buses() {
    let server = MemoryServer::new();

    let service_bus = Bus::with_memory(server.clone(), StoreConfig::testing()).unwrap();
    register_text_services(&service_bus);
    service_bus
        .run(rediservice::Selector::pattern(r"^text\.").unwrap(), &RunOptions::new())
        .unwrap();

    let client = Bus::with_memory(server, StoreConfig::testing()).unwrap();
    let results = collect(&client, "text.join", Pattern::new().present("result"));

    client
        .send("text.join", json!({ "words": ["over", "the", "wire"], "sep": "-" }), None)
        .unwrap();

    let message = results.recv_timeout(WAIT).unwrap();
    assert_eq!(message["result"], json!("over-the-wire"));
    assert!(client.running().is_empty());
    assert_eq!(service_bus.running().len(), 2);
}
