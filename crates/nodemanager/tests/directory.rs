//! Integration tests for the SIPAuthServe client: registry access, the
//! subscriber join, and the multi-write subscriber operations.

mod common;

use common::ScriptedTransport;
use nodemanager::prelude::*;
use serde_json::{json, Value};

fn qualifier(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

fn ok(data: Value) -> Value {
    json!({"code": 200, "data": data})
}

fn not_found() -> Value {
    json!({"code": 404, "data": "not found"})
}

// =========================================================================
// Registry read/update
// =========================================================================

#[tokio::test]
async fn test_read_sip_buddies_sends_projection_and_match() {
    let (transport, wire) = ScriptedTransport::new();
    let directory =
        SubscriberDirectory::new(transport.reply(ok(json!({"ipaddr": "0.0.0.0"}))));

    let response = directory
        .read_sip_buddies(Some(&["ipaddr"]), qualifier(&[("name", "NAME")]))
        .await
        .unwrap();

    assert_eq!(
        wire.last_sent(),
        json!({
            "command": "sip_buddies",
            "action": "read",
            "match": {"name": "NAME"},
            "fields": ["ipaddr"]
        })
    );
    assert_eq!(response.code, StatusCode::OK);
}

#[tokio::test]
async fn test_read_registry_all_columns_sends_null_fields() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!([]))));

    directory
        .read_registry("dialdata_table", None, FieldMap::new())
        .await
        .unwrap();

    assert_eq!(
        wire.last_sent(),
        json!({"command": "dialdata_table", "action": "read", "match": {}, "fields": null})
    );
}

#[tokio::test]
async fn test_read_registry_not_found_is_an_error() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(not_found()));

    let err = directory
        .read_sip_buddies(Some(&["ipaddr"]), qualifier(&[("name", "non-existent")]))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(wire.send_count(), 1);
}

#[tokio::test]
async fn test_update_sip_buddies_sends_value_mapping() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!("SQLITE_DONE"))));

    let response = directory
        .update_sip_buddies(qualifier(&[("ipaddr", "0.0.0.0")]), qualifier(&[("name", "NAME")]))
        .await
        .unwrap();

    assert_eq!(
        wire.last_sent(),
        json!({
            "command": "sip_buddies",
            "action": "update",
            "match": {"name": "NAME"},
            "fields": {"ipaddr": "0.0.0.0"}
        })
    );
    assert_eq!(response.data_str(), Some("SQLITE_DONE"));
}

#[tokio::test]
async fn test_registry_rejects_unknown_table_before_sending() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport);

    let err = directory
        .read_registry("subscribers", None, FieldMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let err = directory
        .update_registry("RRLP", qualifier(&[("a", "b")]), FieldMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(wire.send_count(), 0);
}

#[tokio::test]
async fn test_registry_rejects_malformed_shapes_before_sending() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport);

    // Empty column name in the projection.
    let err = directory
        .read_registry("sip_buddies", Some(&["ipaddr", ""]), FieldMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    // Update that sets nothing.
    let err = directory
        .update_registry("sip_buddies", FieldMap::new(), qualifier(&[("name", "A")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    // Empty qualifier key.
    let err = directory
        .update_dialdata(qualifier(&[("exten", "1")]), qualifier(&[(" ", "A")]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(wire.send_count(), 0);
}

// =========================================================================
// Single-column helpers
// =========================================================================

#[tokio::test]
async fn test_get_ipaddr_and_port() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(ok(json!([{"ipaddr": "10.0.0.7"}])))
            .reply(ok(json!([{"port": 5062}]))),
    );

    assert_eq!(directory.get_ipaddr("IMSI001").await.unwrap(), "10.0.0.7");
    assert_eq!(directory.get_port("IMSI001").await.unwrap(), "5062");

    let sent = wire.sent();
    assert_eq!(sent[0]["match"], json!({"name": "IMSI001"}));
    assert_eq!(sent[0]["fields"], json!(["ipaddr"]));
    assert_eq!(sent[1]["fields"], json!(["port"]));
}

#[tokio::test]
async fn test_update_ipaddr_and_port() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport.reply(ok(json!("SQLITE_DONE"))).reply(ok(json!("SQLITE_DONE"))),
    );

    directory.update_ipaddr("IMSI001", "10.0.0.8").await.unwrap();
    directory.update_port("IMSI001", 5064).await.unwrap();

    let sent = wire.sent();
    assert_eq!(
        sent[0],
        json!({
            "command": "sip_buddies",
            "action": "update",
            "match": {"name": "IMSI001"},
            "fields": {"ipaddr": "10.0.0.8"}
        })
    );
    assert_eq!(sent[1]["fields"], json!({"port": "5064"}));
}

// =========================================================================
// Numbers
// =========================================================================

#[tokio::test]
async fn test_get_numbers_for_imsi() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport.reply(ok(json!([{"exten": "5551234"}, {"exten": 5555678}]))),
    );

    let numbers = directory.get_numbers(Some("IMSI001")).await.unwrap();

    assert_eq!(numbers, ["5551234", "5555678"]);
    assert_eq!(
        wire.last_sent(),
        json!({
            "command": "dialdata_table",
            "action": "read",
            "match": {"dial": "IMSI001"},
            "fields": ["exten"]
        })
    );
}

#[tokio::test]
async fn test_get_all_numbers_is_unfiltered() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!([]))));

    assert!(directory.get_numbers(None).await.unwrap().is_empty());
    assert_eq!(wire.last_sent()["match"], json!({}));
}

#[tokio::test]
async fn test_get_numbers_empty_imsi_is_unfiltered() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!([{"exten": "1"}]))));

    assert_eq!(directory.get_numbers(Some("")).await.unwrap(), ["1"]);
    assert_eq!(wire.last_sent()["match"], json!({}));
}

#[tokio::test]
async fn test_add_number_creates_dial_row() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!("SQLITE_DONE"))));

    directory.add_number("IMSI001", "5551234").await.unwrap();

    assert_eq!(
        wire.last_sent(),
        json!({
            "command": "dialdata_table",
            "action": "create",
            "fields": {"dial": "IMSI001", "exten": "5551234"}
        })
    );
}

#[tokio::test]
async fn test_delete_number_not_attached_sends_no_delete() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!([{"exten": "5551234"}]))));

    let err = directory.delete_number("IMSI001", "5559999").await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::NotAttached { ref imsi, ref number }
            if imsi == "IMSI001" && number == "5559999"
    ));
    // Only the lookup of current numbers went out.
    let sent = wire.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "read");
    assert!(sent.iter().all(|frame| frame["action"] != "delete"));
}

#[tokio::test]
async fn test_delete_number_attached_sends_delete() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(ok(json!([{"exten": "5551234"}, {"exten": "5555678"}])))
            .reply(json!({"code": 204})),
    );

    let response = directory.delete_number("IMSI001", "5555678").await.unwrap();

    assert!(response.is_no_content());
    assert_eq!(
        wire.last_sent(),
        json!({
            "command": "dialdata_table",
            "action": "delete",
            "match": {"dial": "IMSI001", "exten": "5555678"}
        })
    );
}

// =========================================================================
// Subscriber join
// =========================================================================

#[tokio::test]
async fn test_get_subscribers_joins_numbers_in_dial_order() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(ok(json!([{"name": "A", "ipaddr": "127.0.0.1", "port": "5062"}])))
            .reply(ok(json!([
                {"dial": "A", "exten": "111"},
                {"dial": "A", "exten": "222"},
                {"dial": "B", "exten": "333"}
            ]))),
    );

    let subscribers = directory.get_subscribers(None).await.unwrap();

    assert_eq!(
        subscribers,
        vec![Subscriber {
            name: "A".into(),
            ipaddr: Some("127.0.0.1".into()),
            port: Some("5062".into()),
            numbers: vec!["111".into(), "222".into()],
        }]
    );

    let sent = wire.sent();
    assert_eq!(
        sent[0],
        json!({
            "command": "sip_buddies",
            "action": "read",
            "match": {},
            "fields": ["name", "ipaddr", "port"]
        })
    );
    assert_eq!(
        sent[1],
        json!({
            "command": "dialdata_table",
            "action": "read",
            "match": {},
            "fields": ["dial", "exten"]
        })
    );
}

#[tokio::test]
async fn test_get_subscribers_filters_both_reads_by_imsi() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(ok(json!([{"name": "A", "ipaddr": "127.0.0.1", "port": 5062}])))
            .reply(ok(json!([{"dial": "A", "exten": "111"}]))),
    );

    let subscribers = directory.get_subscribers(Some("A")).await.unwrap();

    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0].port.as_deref(), Some("5062"));
    let sent = wire.sent();
    assert_eq!(sent[0]["match"], json!({"name": "A"}));
    assert_eq!(sent[1]["match"], json!({"dial": "A"}));
}

#[tokio::test]
async fn test_get_subscribers_empty_imsi_reads_everything() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!([]))).reply(ok(json!([]))));

    assert!(directory.get_subscribers(Some("")).await.unwrap().is_empty());

    let sent = wire.sent();
    assert_eq!(sent[0]["match"], json!({}));
    assert_eq!(sent[1]["match"], json!({}));
}

#[tokio::test]
async fn test_get_subscribers_not_found_is_empty() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(not_found()));

    let subscribers = directory.get_subscribers(Some("Z")).await.unwrap();

    assert!(subscribers.is_empty());
    // No dial read after the directory came back empty.
    assert_eq!(wire.send_count(), 1);
}

#[tokio::test]
async fn test_get_subscribers_without_numbers() {
    let (transport, _wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(ok(json!([{"name": "A", "ipaddr": "127.0.0.1", "port": "5062"}])))
            .reply(not_found()),
    );

    let subscribers = directory.get_subscribers(Some("A")).await.unwrap();
    assert_eq!(subscribers.len(), 1);
    assert!(subscribers[0].numbers.is_empty());
}

#[tokio::test]
async fn test_get_subscribers_propagates_server_fault() {
    let (transport, _wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(json!({"code": 500})));

    let err = directory.get_subscribers(None).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_ERROR));
}

#[tokio::test]
async fn test_get_subscribers_rejects_malformed_rows() {
    let (transport, _wire) = ScriptedTransport::new();
    let directory =
        SubscriberDirectory::new(transport.reply(ok(json!(["subscriber_a", "subscriber_b"]))));

    let err = directory.get_subscribers(None).await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn test_count_subscribers() {
    let (transport, _wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(ok(json!([
                {"name": "A", "ipaddr": "127.0.0.1", "port": "5062"},
                {"name": "B", "ipaddr": "127.0.0.1", "port": "5062"}
            ])))
            .reply(ok(json!([]))),
    );

    assert_eq!(directory.count_subscribers().await.unwrap(), 2);
}

#[tokio::test]
async fn test_count_subscribers_not_found_is_zero() {
    let (transport, _wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(not_found()));

    assert_eq!(directory.count_subscribers().await.unwrap(), 0);
}

// =========================================================================
// Subscriber writes
// =========================================================================

fn new_subscriber(ki: Option<&str>) -> NewSubscriber {
    NewSubscriber {
        imsi: "310150123456789".into(),
        msisdn: "123456789".into(),
        ipaddr: "127.0.0.1".into(),
        port: 1234,
        ki: ki.map(str::to_string),
    }
}

#[tokio::test]
async fn test_create_subscriber_writes_directory_then_number() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport.reply(json!({"code": 204})).reply(json!({"code": 204})),
    );

    directory.create_subscriber(&new_subscriber(Some("abc"))).await.unwrap();

    let sent = wire.sent();
    assert_eq!(
        sent[0],
        json!({
            "command": "subscribers",
            "action": "create",
            "fields": {
                "name": "310150123456789",
                "imsi": "310150123456789",
                "msisdn": "123456789",
                "ipaddr": "127.0.0.1",
                "port": "1234",
                "ki": "abc"
            }
        })
    );
    assert_eq!(
        sent[1],
        json!({
            "command": "dialdata_table",
            "action": "create",
            "fields": {"dial": "310150123456789", "exten": "123456789"}
        })
    );
}

#[tokio::test]
async fn test_create_subscriber_without_ki_sends_empty_ki() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport.reply(json!({"code": 204})).reply(json!({"code": 204})),
    );

    directory.create_subscriber(&new_subscriber(None)).await.unwrap();
    assert_eq!(wire.sent()[0]["fields"]["ki"], "");
}

#[tokio::test]
async fn test_create_subscriber_second_write_failure_leaves_first() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(json!({"code": 204}))
            .reply(json!({"code": 409, "data": "duplicate exten"})),
    );

    let err = directory
        .create_subscriber(&new_subscriber(None))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    // Both writes went out; nothing tried to undo the first.
    assert_eq!(wire.send_count(), 2);
}

#[tokio::test]
async fn test_update_subscriber_writes_both_tables() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport.reply(ok(json!("SQLITE_DONE"))).reply(ok(json!("SQLITE_DONE"))),
    );

    let update = SubscriberUpdate {
        msisdn: Some("1234567890".into()),
        ipaddr: Some("127.0.0.1".into()),
        port: Some(1234),
    };
    directory.update_subscriber("310150123456789", &update).await.unwrap();

    let sent = wire.sent();
    assert_eq!(
        sent[0],
        json!({
            "command": "sip_buddies",
            "action": "update",
            "match": {"name": "310150123456789"},
            "fields": {"ipaddr": "127.0.0.1", "port": "1234"}
        })
    );
    assert_eq!(
        sent[1],
        json!({
            "command": "dialdata_table",
            "action": "update",
            "match": {"dial": "310150123456789"},
            "fields": {"exten": "1234567890"}
        })
    );
}

#[tokio::test]
async fn test_update_subscriber_number_only_skips_directory() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(ok(json!("SQLITE_DONE"))));

    let update = SubscriberUpdate {
        msisdn: Some("1234567890".into()),
        ..SubscriberUpdate::default()
    };
    directory.update_subscriber("310150123456789", &update).await.unwrap();

    let sent = wire.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["command"], "dialdata_table");
}

#[tokio::test]
async fn test_update_subscriber_with_nothing_fails_locally() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport);

    let err = directory
        .update_subscriber("310150123456789", &SubscriberUpdate::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(wire.send_count(), 0);
}

#[tokio::test]
async fn test_delete_subscriber_removes_directory_then_numbers() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport.reply(json!({"code": 204})).reply(json!({"code": 204})),
    );

    directory.delete_subscriber("310150123456789").await.unwrap();

    let sent = wire.sent();
    assert_eq!(
        sent[0],
        json!({
            "command": "subscribers",
            "action": "delete",
            "match": {"imsi": "310150123456789"}
        })
    );
    assert_eq!(
        sent[1],
        json!({
            "command": "dialdata_table",
            "action": "delete",
            "match": {"dial": "310150123456789"}
        })
    );
}

#[tokio::test]
async fn test_delete_subscriber_without_numbers_succeeds() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(json!({"code": 200, "data": "deleted"}))
            .reply(not_found()),
    );

    let response = directory.delete_subscriber("310150123456789").await.unwrap();

    assert_eq!(response.data_str(), Some("deleted"));
    assert_eq!(wire.send_count(), 2);
}

#[tokio::test]
async fn test_delete_subscriber_number_fault_is_reported() {
    let (transport, _wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(
        transport
            .reply(json!({"code": 204}))
            .reply(json!({"code": 500, "data": "SQLITE_BUSY"})),
    );

    let err = directory.delete_subscriber("310150123456789").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_ERROR));
}

#[tokio::test]
async fn test_delete_subscriber_stops_after_failed_first_write() {
    let (transport, wire) = ScriptedTransport::new();
    let directory = SubscriberDirectory::new(transport.reply(not_found()));

    let err = directory.delete_subscriber("310150123456789").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(wire.send_count(), 1);
}
