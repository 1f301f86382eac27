//! End-to-end pipeline tests: raw JSON messages in, channel deliveries,
//! alarm events and store state out.

use pelorus_core::{AlarmAction, PrimitiveValue, Severity, Zone};
use pelorus_engine::{ChannelUpdate, DataService, IdentityConverter};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn service() -> DataService {
    DataService::new(Arc::new(IdentityConverter))
}

fn sog_delta(source: &str, value: f64) -> String {
    format!(
        r#"{{
            "context": "vessels.self",
            "updates": [{{
                "$source": "{source}",
                "timestamp": "2024-01-17T10:30:00.000Z",
                "values": [{{"path": "navigation.speedOverGround", "value": {value}}}]
            }}]
        }}"#
    )
}

#[test]
fn test_idempotent_subscription_single_delivery() {
    let mut svc = service();

    let first = svc.subscribe("widget-1", "self.navigation.speedOverGround", "default");
    let second = svc.subscribe("widget-1", "self.navigation.speedOverGround", "default");
    assert!(Arc::ptr_eq(&first, &second));

    let mut rx = first.updates();
    rx.borrow_and_update();

    svc.handle_delta_text(&sog_delta("gps1", 3.0)).unwrap();

    // Exactly one pending delivery for the one update
    assert!(rx.has_changed().unwrap());
    assert_eq!(
        rx.borrow_and_update().value,
        Some(PrimitiveValue::Number(3.0))
    );
    assert!(!rx.has_changed().unwrap());
}

#[test]
fn test_compound_value_decomposes_into_independent_records() {
    let mut svc = service();
    svc.handle_delta_text(
        r#"{
            "context": "vessels.self",
            "updates": [{
                "$source": "gps1",
                "timestamp": "2024-01-17T10:30:00.000Z",
                "values": [{
                    "path": "navigation.position",
                    "value": {"latitude": 47.1, "longitude": -122.6}
                }]
            }]
        }"#,
    )
    .unwrap();

    let lat = svc.get_path("self.navigation.position.latitude").unwrap();
    let lon = svc.get_path("self.navigation.position.longitude").unwrap();
    assert_eq!(lat.current_value, Some(PrimitiveValue::Number(47.1)));
    assert_eq!(lon.current_value, Some(PrimitiveValue::Number(-122.6)));
    assert_eq!(lat.default_source.as_deref(), Some("gps1"));
    assert_eq!(lon.default_source.as_deref(), Some("gps1"));
    // The compound parent itself is not a record
    assert!(svc.get_path("self.navigation.position").is_none());
}

#[test]
fn test_default_source_follows_last_writer_concrete_source_does_not() {
    let mut svc = service();
    let default_chan = svc.subscribe("widget-default", "self.navigation.speedOverGround", "default");
    let gps1_chan = svc.subscribe("widget-gps1", "self.navigation.speedOverGround", "gps1");

    svc.handle_delta_text(&sog_delta("gps1", 10.0)).unwrap();
    svc.handle_delta_text(&sog_delta("gps2", 12.0)).unwrap();

    assert_eq!(
        default_chan.latest().value,
        Some(PrimitiveValue::Number(12.0))
    );
    assert_eq!(gps1_chan.latest().value, Some(PrimitiveValue::Number(10.0)));

    // gps1 reports again; the default consumer follows it back
    svc.handle_delta_text(&sog_delta("gps1", 11.0)).unwrap();
    assert_eq!(
        default_chan.latest().value,
        Some(PrimitiveValue::Number(11.0))
    );
    assert_eq!(gps1_chan.latest().value, Some(PrimitiveValue::Number(11.0)));
}

#[test]
fn test_zone_edge_triggering_over_value_sequence() {
    let mut svc = service();
    svc.set_zones(vec![Zone {
        path: "self.navigation.speedOverGround".to_string(),
        unit: None,
        lower: Some(10.0),
        upper: Some(20.0),
        severity: Severity::Alarm,
        message: None,
    }]);
    let mut alarms = svc.alarm_events();

    for value in [5.0, 15.0, 25.0, 5.0] {
        svc.handle_delta_text(&sog_delta("gps1", value)).unwrap();
    }

    let mut actions = Vec::new();
    while let Ok(event) = alarms.try_recv() {
        actions.push(event.action);
    }
    // One raise at 15, one clear at the final 5, nothing else
    assert_eq!(actions, vec![AlarmAction::Raised, AlarmAction::Cleared]);
}

#[test]
fn test_unknown_path_lookups_never_fail() {
    let mut svc = service();
    assert!(svc.get_path("nonexistent").is_none());
    svc.unsubscribe("x", "nonexistent");
    svc.notify_stale("nonexistent");
}

#[test]
fn test_self_context_canonicalization_from_hello() {
    let mut svc = service();
    svc.handle_delta_text(r#"{"self":"vessels.urn:abc","roles":[]}"#)
        .unwrap();

    svc.handle_delta_text(
        r#"{
            "context": "vessels.urn:abc",
            "updates": [{
                "$source": "gps1",
                "timestamp": "2024-01-17T10:30:00.000Z",
                "values": [{"path": "navigation.speedOverGround", "value": 3.0}]
            }]
        }"#,
    )
    .unwrap();
    svc.handle_delta_text(
        r#"{
            "context": "vessels.urn:other",
            "updates": [{
                "$source": "ais",
                "timestamp": "2024-01-17T10:30:00.000Z",
                "values": [{"path": "navigation.speedOverGround", "value": 5.0}]
            }]
        }"#,
    )
    .unwrap();

    assert!(svc.get_path("self.navigation.speedOverGround").is_some());
    assert!(svc
        .get_path("vessels.urn:other.navigation.speedOverGround")
        .is_some());
}

#[test]
fn test_dangling_registration_keeps_receiving() {
    let mut svc = service();
    let dangling = svc.subscribe("widget-gone", "self.navigation.speedOverGround", "default");

    svc.handle_delta_text(&sog_delta("gps1", 3.0)).unwrap();
    // The widget is "gone" but never unsubscribed: deliveries continue,
    // which is exactly the leak callers must avoid by unsubscribing.
    assert_eq!(dangling.latest().value, Some(PrimitiveValue::Number(3.0)));

    svc.unsubscribe("widget-gone", "self.navigation.speedOverGround");
    svc.handle_delta_text(&sog_delta("gps1", 9.0)).unwrap();
    assert_eq!(dangling.latest().value, Some(PrimitiveValue::Number(3.0)));
}

#[test]
fn test_snapshot_then_delta_layering() {
    let mut svc = service();
    svc.handle_full_text(
        r#"{
            "self": "vessels.urn:abc",
            "vessels": {
                "urn:abc": {
                    "navigation": {
                        "speedOverGround": {
                            "timestamp": "2024-01-17T10:29:00.000Z",
                            "$source": "gps1",
                            "value": 2.5,
                            "meta": {"units": "m/s"}
                        }
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let record = svc.get_path("self.navigation.speedOverGround").unwrap();
    assert_eq!(record.current_value, Some(PrimitiveValue::Number(2.5)));
    assert_eq!(record.meta.as_ref().unwrap().units.as_deref(), Some("m/s"));

    // A later delta refines the snapshot value; meta survives
    svc.handle_delta_text(&sog_delta("gps1", 3.1)).unwrap();
    let record = svc.get_path("self.navigation.speedOverGround").unwrap();
    assert_eq!(record.current_value, Some(PrimitiveValue::Number(3.1)));
    assert_eq!(record.meta.as_ref().unwrap().units.as_deref(), Some("m/s"));
}

#[test]
fn test_reset_after_reconnect_rebuilds_cleanly() {
    let mut svc = service();
    svc.handle_delta_text(r#"{"self":"vessels.urn:abc","roles":[]}"#)
        .unwrap();
    svc.handle_delta_text(&sog_delta("gps1", 3.0)).unwrap();
    let channel = svc.subscribe("widget-1", "self.navigation.speedOverGround", "default");

    svc.reset();
    assert_eq!(svc.self_id(), None);
    assert_eq!(svc.path_count(), 0);
    assert_eq!(channel.latest(), ChannelUpdate::default());

    // New server, new self identity, same surviving registration
    svc.handle_delta_text(r#"{"self":"vessels.urn:xyz","roles":[]}"#)
        .unwrap();
    svc.handle_delta_text(
        r#"{
            "context": "vessels.urn:xyz",
            "updates": [{
                "$source": "gps2",
                "timestamp": "2024-01-17T11:00:00.000Z",
                "values": [{"path": "navigation.speedOverGround", "value": 6.0}]
            }]
        }"#,
    )
    .unwrap();

    assert_eq!(svc.self_id().as_deref(), Some("vessels.urn:xyz"));
    assert_eq!(channel.latest().value, Some(PrimitiveValue::Number(6.0)));
}
