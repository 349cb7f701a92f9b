#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceSession` against a wiremock device.
//
// The poll interval is kept short (100ms) so tests can observe a few
// cycles with plain sleeps.

use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use keybridge_core::{
    CoreError, DeviceRecord, DeviceSession, LightProperty, NetworkLocation,
};

const POLL: Duration = Duration::from_millis(100);

// ── Helpers ─────────────────────────────────────────────────────────

fn record_for(server: &MockServer, name: &str) -> DeviceRecord {
    let addr = server.address();
    DeviceRecord {
        identity: "3C:6A:9D:12:34:56".into(),
        location: NetworkLocation::new(addr.ip().to_string(), addr.port()),
        friendly_name: name.to_owned(),
    }
}

fn info_json(display_name: &str) -> serde_json::Value {
    json!({
        "productName": "Elgato Key Light",
        "hardwareBoardType": 53,
        "firmwareBuildNumber": 199,
        "firmwareVersion": "1.0.3",
        "serialNumber": "CW16K1A00775",
        "displayName": display_name,
        "features": ["lights"]
    })
}

fn lights_json(on: u16, brightness: u16, temperature: u16) -> serde_json::Value {
    json!({
        "numberOfLights": 1,
        "lights": [{ "on": on, "brightness": brightness, "temperature": temperature }]
    })
}

fn settings_json(brightness: u32) -> serde_json::Value {
    json!({
        "powerOnBehavior": 1,
        "powerOnBrightness": brightness,
        "powerOnTemperature": 213,
        "switchOnDurationMs": 100,
        "switchOffDurationMs": 300,
        "colorChangeDurationMs": 100
    })
}

/// Mount info + settings; the caller mounts `lights` per scenario.
async fn mount_static(server: &MockServer, display_name: &str) {
    Mock::given(method("GET"))
        .and(path("/elgato/accessory-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_json(display_name)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(20)))
        .mount(server)
        .await;
}

/// Register a channel-backed listener and return the receiver.
fn watch_changes(session: &DeviceSession) -> mpsc::UnboundedReceiver<(LightProperty, u16)> {
    let (tx, rx) = mpsc::unbounded_channel();
    session.on_property_changed(move |property, value| {
        let _ = tx.send((property, value));
    });
    rx
}

async fn recv_change(
    rx: &mut mpsc::UnboundedReceiver<(LightProperty, u16)>,
) -> Option<(LightProperty, u16)> {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .ok()
        .flatten()
}

// ── Hydration ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_hydration_failure_yields_no_session() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    // `GET lights` answers 500 — one failed fetch sinks the whole creation.
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = DeviceSession::connect(record_for(&server, "Desk Light"), POLL).await;

    assert!(
        matches!(result, Err(CoreError::Hydration { ref name, .. }) if name == "Desk Light"),
        "expected Hydration error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_hydration_snapshot_seeds_the_cache() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(1, 42, 213)))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    assert_eq!(session.get_property(LightProperty::On), 1);
    assert_eq!(session.get_property(LightProperty::Brightness), 42);
    assert_eq!(session.get_property(LightProperty::Temperature), 213);
    assert_eq!(session.serial_number(), "CW16K1A00775");
    assert_eq!(session.manufacturer(), "Elgato");
    assert_eq!(session.model(), "Elgato Key Light");

    // Debug output identifies the device without dumping internals.
    assert!(format!("{session:?}").contains("Desk Light"));
}

#[tokio::test]
async fn test_properties_read_zero_until_a_snapshot_exists() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    // Hydration sees no light elements; the first poll delivers them.
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "numberOfLights": 0,
            "lights": []
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(1, 42, 213)))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();
    let mut changes = watch_changes(&session);

    // No snapshot yet: every property reads as zero.
    assert_eq!(session.get_property(LightProperty::On), 0);
    assert_eq!(session.get_property(LightProperty::Brightness), 0);
    assert_eq!(session.get_property(LightProperty::Temperature), 0);

    // The first populated poll seeds the cache silently; there is no
    // baseline to diff against.
    assert_eq!(recv_change(&mut changes).await, None);
    assert_eq!(session.get_property(LightProperty::On), 1);
    assert_eq!(session.get_property(LightProperty::Brightness), 42);
    assert_eq!(session.get_property(LightProperty::Temperature), 213);
}

#[tokio::test]
async fn test_display_name_falls_back_to_friendly_name() {
    let server = MockServer::start().await;
    mount_static(&server, "").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 10, 150)))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Key Light Left"), POLL)
        .await
        .unwrap();

    assert_eq!(session.display_name(), "Key Light Left");
}

#[tokio::test]
async fn test_device_reported_display_name_wins() {
    let server = MockServer::start().await;
    mount_static(&server, "Studio Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 10, 150)))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Key Light Left"), POLL)
        .await
        .unwrap();

    assert_eq!(session.display_name(), "Studio Light");
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_poll_notifies_per_changed_field_in_order() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    // Hydration sees the baseline once; every poll after that sees the
    // changed state.
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(1, 20, 210)))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();
    let mut changes = watch_changes(&session);

    // on and temperature differ, brightness does not; evaluation order
    // is on, temperature, brightness.
    assert_eq!(recv_change(&mut changes).await, Some((LightProperty::On, 1)));
    assert_eq!(
        recv_change(&mut changes).await,
        Some((LightProperty::Temperature, 210))
    );

    // The second poll sees no further drift.
    assert_eq!(recv_change(&mut changes).await, None);

    // Cache replaced with the fresh snapshot.
    assert_eq!(session.get_property(LightProperty::On), 1);
    assert_eq!(session.get_property(LightProperty::Temperature), 210);
}

#[tokio::test]
async fn test_poll_failure_keeps_cache_and_cadence() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(1, 42, 213)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Two failed cycles, then a changed snapshot.
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(1, 60, 213)))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();
    let mut changes = watch_changes(&session);

    // Failed cycles leave the hydration snapshot in place and raise nothing.
    tokio::time::sleep(POLL + Duration::from_millis(50)).await;
    assert_eq!(session.get_property(LightProperty::Brightness), 42);

    // The loop recovers on its own: diff is against the last *success*.
    assert_eq!(
        recv_change(&mut changes).await,
        Some((LightProperty::Brightness, 60))
    );
    assert_eq!(session.get_property(LightProperty::Brightness), 60);
}

#[tokio::test]
async fn test_update_location_redirects_polling() {
    let old_server = MockServer::start().await;
    mount_static(&old_server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&old_server)
        .await;

    let session = DeviceSession::connect(record_for(&old_server, "Desk Light"), POLL)
        .await
        .unwrap();

    let new_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(1, 20, 200)))
        .mount(&new_server)
        .await;

    let mut changes = watch_changes(&session);
    let addr = new_server.address();
    session.update_location(NetworkLocation::new(addr.ip().to_string(), addr.port()));

    assert_eq!(recv_change(&mut changes).await, Some((LightProperty::On, 1)));
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_set_property_does_not_touch_the_cache() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    session
        .set_property(LightProperty::Brightness, 90)
        .await
        .unwrap();

    // No optimistic update: the cache still holds the polled value.
    assert_eq!(session.get_property(LightProperty::Brightness), 20);
}

#[tokio::test]
async fn test_set_property_failure_surfaces() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    let result = session.set_property(LightProperty::On, 1).await;
    assert!(
        matches!(result, Err(CoreError::Device(_))),
        "expected Device error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_temperature_is_clamped_before_transmission() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights"))
        .and(body_json(json!({ "lights": [{ "temperature": 344 }] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights"))
        .and(body_json(json!({ "lights": [{ "temperature": 143 }] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    session
        .set_property(LightProperty::Temperature, 400)
        .await
        .unwrap();
    session
        .set_property(LightProperty::Temperature, 10)
        .await
        .unwrap();
}

// ── Settings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_settings_refreshes_from_device() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/elgato/accessory-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_json("Desk Light")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&server)
        .await;
    // Hydration read, then the post-write read-back with the device's
    // own notion of the new settings.
    Mock::given(method("GET"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(20)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(55)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    let mut desired = session.settings();
    desired.power_on_brightness = 50;
    session.update_settings(desired).await;

    // The read-back wins over the intended values.
    assert_eq!(session.settings().power_on_brightness, 55);
}

#[tokio::test]
async fn test_update_settings_trusts_intended_values_when_readback_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/elgato/accessory-info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(info_json("Desk Light")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(settings_json(20)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    let mut desired = session.settings();
    desired.power_on_brightness = 50;
    session.update_settings(desired).await;

    assert_eq!(session.settings().power_on_brightness, 50);
}

#[tokio::test]
async fn test_update_settings_write_failure_leaves_cache_alone() {
    let server = MockServer::start().await;
    mount_static(&server, "Desk Light").await;
    Mock::given(method("GET"))
        .and(path("/elgato/lights"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lights_json(0, 20, 200)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/elgato/lights/settings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = DeviceSession::connect(record_for(&server, "Desk Light"), POLL)
        .await
        .unwrap();

    let mut desired = session.settings();
    desired.power_on_brightness = 99;
    session.update_settings(desired).await;

    assert_eq!(session.settings().power_on_brightness, 20);
}
