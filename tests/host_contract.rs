use serde_json::json;
use std::sync::Arc;
use voluma::VolumaError;
use voluma::controller::MemoryLink;
use voluma::host::{
    CommandEnvelope, CommandName, PROTOCOL_VERSION, StoreHostHandler, command_channel,
};
use voluma::storage::MemoryKvStore;
use voluma::tabs::NoBadge;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc123";

fn handler() -> StoreHostHandler<MemoryKvStore, NoBadge> {
    StoreHostHandler::new(Arc::new(MemoryKvStore::new()), NoBadge)
}

fn envelope(command: CommandName, payload: serde_json::Value) -> CommandEnvelope {
    CommandEnvelope::new(uuid::Uuid::new_v4().to_string(), command, payload)
}

#[test]
fn command_names_round_trip_through_the_wire_format() {
    let names = [
        CommandName::HostPing,
        CommandName::HostVersion,
        CommandName::MemorySave,
        CommandName::MemoryCheck,
        CommandName::MemoryFind,
        CommandName::MemoryList,
        CommandName::MemoryExport,
        CommandName::MemoryImport,
        CommandName::MemoryDelete,
        CommandName::MemoryToggleGet,
        CommandName::MemoryToggleSet,
        CommandName::BadgeUpdate,
    ];
    for name in names {
        assert_eq!(CommandName::parse(name.as_str()), Some(name));
    }
    assert_eq!(CommandName::parse("memory.not_real"), None);
}

#[test]
fn envelope_validation_rejects_bad_versions_and_ids() {
    let mut envelope = CommandEnvelope::new("req-1", CommandName::HostPing, json!({}));
    assert!(envelope.validate().is_ok());

    envelope.v = PROTOCOL_VERSION + 1;
    assert!(envelope.validate().is_err());

    envelope.v = PROTOCOL_VERSION;
    envelope.request_id = "  ".to_owned();
    assert!(envelope.validate().is_err());
}

#[test]
fn envelope_json_shape_is_stable() {
    let envelope = CommandEnvelope::new("req-123", CommandName::MemorySave, json!({"url": "u"}));
    let value = serde_json::to_value(&envelope).expect("encode");
    assert_eq!(value["v"], json!(PROTOCOL_VERSION));
    assert_eq!(value["request_id"], json!("req-123"));
    assert_eq!(value["command"], json!("memory.save"));
    assert_eq!(value["payload"]["url"], json!("u"));
}

#[tokio::test]
async fn save_check_find_flow_over_the_channel() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    let response = client
        .send(envelope(CommandName::MemoryToggleSet, json!({"enabled": true})))
        .await
        .expect("toggle set");
    assert!(response.ok);

    let response = client
        .send(envelope(
            CommandName::MemorySave,
            json!({"url": WATCH_URL, "volume": 150, "isMuted": false, "videoTitle": "T"}),
        ))
        .await
        .expect("save");
    assert_eq!(response.payload, json!({"success": true, "saved": true}));

    let response = client
        .send(envelope(CommandName::MemoryCheck, json!({"url": WATCH_URL})))
        .await
        .expect("check");
    assert_eq!(response.payload, json!({"hasMemory": true}));

    let response = client
        .send(envelope(CommandName::MemoryFind, json!({"url": WATCH_URL})))
        .await
        .expect("find");
    assert_eq!(response.payload["volume"], json!(150));
    assert_eq!(response.payload["title"], json!("T"));
}

#[tokio::test]
async fn saving_the_default_reports_saved_false() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    client
        .send(envelope(CommandName::MemoryToggleSet, json!({"enabled": true})))
        .await
        .expect("toggle set");

    let response = client
        .send(envelope(
            CommandName::MemorySave,
            json!({"url": WATCH_URL, "volume": 100, "isMuted": false}),
        ))
        .await
        .expect("save");
    assert_eq!(response.payload, json!({"success": true, "saved": false}));
}

#[tokio::test]
async fn export_import_round_trip_over_the_channel() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    client
        .send(envelope(CommandName::MemoryToggleSet, json!({"enabled": true})))
        .await
        .expect("toggle set");
    client
        .send(envelope(
            CommandName::MemorySave,
            json!({"url": WATCH_URL, "volume": 300, "isMuted": true}),
        ))
        .await
        .expect("save");

    let exported = client
        .send(envelope(CommandName::MemoryExport, json!({})))
        .await
        .expect("export");
    assert_eq!(exported.payload["data"]["settingsCount"], json!(1));

    // Restore into a fresh store.
    let (client2, server2) = command_channel(8, 8, handler());
    tokio::spawn(server2.run());

    let imported = client2
        .send(envelope(
            CommandName::MemoryImport,
            exported.payload["data"].clone(),
        ))
        .await
        .expect("import");
    assert_eq!(imported.payload, json!({"success": true, "importedCount": 1}));

    let listed = client2
        .send(envelope(CommandName::MemoryList, json!({})))
        .await
        .expect("list");
    assert_eq!(listed.payload["settings"][0]["volume"], json!(300));
    assert_eq!(listed.payload["settings"][0]["isMuted"], json!(true));
}

#[tokio::test]
async fn malformed_import_fails_with_a_message() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    let err = client
        .send(envelope(CommandName::MemoryImport, json!({"settings": 42})))
        .await
        .expect_err("must fail");
    assert!(matches!(err, VolumaError::Validation(_)));
}

#[tokio::test]
async fn delete_reports_the_requested_count() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    client
        .send(envelope(CommandName::MemoryToggleSet, json!({"enabled": true})))
        .await
        .expect("toggle set");
    client
        .send(envelope(
            CommandName::MemorySave,
            json!({"url": WATCH_URL, "volume": 150, "isMuted": false}),
        ))
        .await
        .expect("save");

    let response = client
        .send(envelope(
            CommandName::MemoryDelete,
            json!({"identities": ["youtube:abc123", "youtube:missing"]}),
        ))
        .await
        .expect("delete");
    assert_eq!(response.payload, json!({"success": true, "deletedCount": 2}));

    let response = client
        .send(envelope(CommandName::MemoryCheck, json!({"url": WATCH_URL})))
        .await
        .expect("check");
    assert_eq!(response.payload, json!({"hasMemory": false}));
}

#[tokio::test]
async fn badge_update_emits_a_broadcast_event() {
    let (client, server) = command_channel(8, 8, handler());
    let mut events = client.subscribe_events();
    tokio::spawn(server.run());

    client
        .send(envelope(
            CommandName::BadgeUpdate,
            json!({"tabId": 3, "volume": 250, "isMuted": false}),
        ))
        .await
        .expect("badge update");

    let event = events.recv().await.expect("event");
    assert_eq!(event.event, "badge.updated");
    assert_eq!(event.payload["volume"], json!(250));
}

#[tokio::test]
async fn the_client_doubles_as_the_controller_memory_link() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    client
        .send(envelope(CommandName::MemoryToggleSet, json!({"enabled": true})))
        .await
        .expect("toggle set");

    let outcome = MemoryLink::save(&client, WATCH_URL, 150, false, Some("T".into()))
        .await
        .expect("save");
    assert!(outcome.saved);

    let record = MemoryLink::find(&client, WATCH_URL).await.expect("find").expect("record");
    assert_eq!(record.volume, 150);

    let missing = MemoryLink::find(&client, "https://www.youtube.com/watch?v=none")
        .await
        .expect("find");
    assert!(missing.is_none());

    let outcome = MemoryLink::save(&client, "https://example.com/", 150, false, None)
        .await
        .expect("save non-video");
    assert!(!outcome.saved);
}

#[tokio::test]
async fn ping_and_version_respond() {
    let (client, server) = command_channel(8, 8, handler());
    tokio::spawn(server.run());

    let pong = client
        .send(envelope(CommandName::HostPing, json!({})))
        .await
        .expect("ping");
    assert_eq!(pong.payload, json!({"pong": true}));

    let version = client
        .send(envelope(CommandName::HostVersion, json!({})))
        .await
        .expect("version");
    assert_eq!(version.payload["protocol_version"], json!(PROTOCOL_VERSION));
}
