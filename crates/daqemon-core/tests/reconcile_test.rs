#![allow(clippy::unwrap_used)]
// End-to-end reconciliation against a mocked metering server.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use daqemon_api::{EmonApi, Endpoints, TransportConfig};
use daqemon_core::{
    Channel, Phase, ProcessCatalogue, ReconcileContext, Reconciler, RemoteSnapshot, ResourceKind,
    StatusEvent, Unit,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, EmonApi) {
    let server = MockServer::start().await;
    let key: SecretString = "apikey123".to_string().into();
    let api = EmonApi::new(&server.uri(), &key, Endpoints::default(), &TransportConfig::rest()).unwrap();
    (server, api)
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true}))
}

fn catalogue() -> ProcessCatalogue {
    ProcessCatalogue::from_value(json!({
        "process__log_to_feed": {"id_num": 1},
        "process__log_to_feed_join": {"id_num": 3},
        "process__kwh_to_kwhd": {"id_num": 4}
    }))
    .unwrap()
}

/// A power channel `p1` and an energy channel `e1` under node `emontx`.
fn context() -> ReconcileContext {
    let mut power = Channel::from_device_input("m1", "powerA", Unit::Power);
    power.name = "p1".into();
    let mut energy = Channel::from_device_input("m1", "meter", Unit::Energy);
    energy.name = "e1".into();
    ReconcileContext {
        node: "emontx".into(),
        device_id: Some(3),
        channels: vec![power, energy],
        snapshot: RemoteSnapshot {
            processes: catalogue(),
            ..RemoteSnapshot::default()
        },
        ..ReconcileContext::default()
    }
}

async fn mount_feed_create(server: &MockServer, name: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/feed/create.json"))
        .and(query_param("name", name))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

// ── Snapshot ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_snapshot_links_ids() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/input/get/emontx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"p1": {"processList": "1:31"}})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/input/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "21", "nodeid": "emontx", "name": "p1", "processList": "1:31"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "31", "name": "p1", "engine": "0", "unit": "W"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/process/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "process__log_to_feed": {"id_num": 1}
        })))
        .mount(&server)
        .await;

    let snapshot = RemoteSnapshot::fetch(&api, "emontx").await.unwrap();
    assert_eq!(snapshot.input("p1").unwrap().id, Some(21));
    assert_eq!(snapshot.feed("p1").unwrap().id, Some(31));
    assert_eq!(snapshot.processes.numeric_id("process__log_to_feed"), Some(1));
}

#[tokio::test]
async fn test_fetch_snapshot_for_numeric_node() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/input/get/17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"p1": {"processList": "1:31"}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/input/get.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "17", "name": "other"})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/input/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "21", "nodeid": "17", "name": "p1", "processList": "1:31"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/process/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let snapshot = RemoteSnapshot::fetch(&api, "17").await.unwrap();
    let p1 = snapshot.input("p1").unwrap();
    assert_eq!(p1.id, Some(21));
    assert_eq!(p1.process_list.as_deref(), Some("1:31"));
}

#[tokio::test]
async fn test_fetch_snapshot_rejects_text() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Invalid API key"))
        .mount(&server)
        .await;

    let err = RemoteSnapshot::fetch(&api, "emontx").await.unwrap_err();
    assert!(err.to_string().contains("Invalid API key"), "got: {err}");
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_runs_phases_in_order() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/input/post"))
        .and(query_param("node", "emontx"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/input/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 21, "nodeid": "emontx", "name": "p1"},
            {"id": 22, "nodeid": "emontx", "name": "e1"},
            {"id": 99, "nodeid": "other", "name": "p1"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_feed_create(&server, "p1", ResponseTemplate::new(200).set_body_json(json!({"success": true, "feedid": 31}))).await;
    mount_feed_create(&server, "e1", ResponseTemplate::new(200).set_body_json(json!({"success": true, "feedid": 32}))).await;
    mount_feed_create(
        &server,
        "e1d",
        ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "exists"})),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/input/process/set"))
        .and(query_param("inputid", "21"))
        .and(body_string("processlist=1%3A31"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/input/process/set"))
        .and(query_param("inputid", "22"))
        .and(body_string("processlist=3%3A32%2C4%3Ae1d"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context();
    let mut rec = Reconciler::new(&api);
    rec.preview(&ctx).unwrap();
    let mut events: Vec<StatusEvent> = Vec::new();
    let report = rec.apply(&mut ctx, &mut events).await.unwrap();

    // Declare, bind, create feeds one by one, then attach processes.
    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let name = r
                .url
                .query_pairs()
                .find(|(k, _)| k == "name" || k == "inputid")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            format!("{} {}", r.url.path(), name).trim().to_owned()
        })
        .collect();
    assert_eq!(
        order,
        vec![
            "/input/post",
            "/input/list.json",
            "/feed/create.json p1",
            "/feed/create.json e1",
            "/feed/create.json e1d",
            "/input/process/set 21",
            "/input/process/set 22",
        ]
    );

    let rows: Vec<(ResourceKind, &str, bool)> = events
        .iter()
        .map(|e| (e.kind, e.item.as_str(), e.success))
        .collect();
    assert_eq!(
        rows,
        vec![
            (ResourceKind::Input, "p1", true),
            (ResourceKind::Input, "e1", true),
            (ResourceKind::Feed, "p1", true),
            (ResourceKind::Feed, "e1", true),
            (ResourceKind::Feed, "e1d", false),
            (ResourceKind::Input, "p1", true),
            (ResourceKind::Feed, "p1", true),
            (ResourceKind::Input, "e1", true),
            (ResourceKind::Feed, "e1", true),
            (ResourceKind::Feed, "e1d", true),
        ]
    );
    assert_eq!(events[4].message.as_deref(), Some("exists"));
    assert_eq!(report.events, events);
    assert_eq!(report.failed(), 1);
    assert!(report.valid);
    assert_eq!(rec.phase(), Phase::Done);

    // The snapshot now reflects what was written; only the failed feed is
    // left to create.
    let plan = rec.preview(&ctx).unwrap();
    assert!(plan.new_inputs.is_empty());
    assert!(plan.inputs.is_empty());
    let feeds: Vec<&str> = plan.feeds.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(feeds, vec!["e1d"]);
}

#[tokio::test]
async fn test_apply_continues_after_declare_failure() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/input/post"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/input/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed/create.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "feedid": 40})))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ok())
        .expect(0)
        .mount(&server)
        .await;

    let mut ctx = context();
    let mut rec = Reconciler::new(&api);
    rec.preview(&ctx).unwrap();
    let report = rec.apply(&mut ctx, &mut ()).await.unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Internal Server Error"));
    let failed_inputs: Vec<&str> = report
        .events
        .iter()
        .filter(|e| e.kind == ResourceKind::Input && !e.success)
        .map(|e| e.item.as_str())
        .collect();
    assert_eq!(failed_inputs, vec!["p1", "e1"]);
    assert_eq!(
        report.events.iter().filter(|e| e.kind == ResourceKind::Feed && e.success).count(),
        3
    );
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_existing_input_update_only() {
    let (server, api) = setup().await;

    Mock::given(method("POST"))
        .and(path("/input/process/set"))
        .and(query_param("inputid", "21"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Invalid process"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context();
    ctx.channels.truncate(1);
    ctx.snapshot.feeds.push(daqemon_core::RemoteFeed {
        id: Some(31),
        name: "p1".into(),
        unit: Some("W".into()),
        engine: Some(0),
        ..daqemon_core::RemoteFeed::default()
    });
    ctx.snapshot.record_input(daqemon_core::RemoteInput {
        id: Some(21),
        name: "p1".into(),
        nodeid: Some("emontx".into()),
        process_list: Some("3:31".into()),
        ..daqemon_core::RemoteInput::default()
    });

    let mut rec = Reconciler::new(&api);
    let plan = rec.preview(&ctx).unwrap();
    assert_eq!(plan.inputs.len(), 1);
    assert!(plan.feeds.is_empty());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut sink = tx;
    let report = rec.apply(&mut ctx, &mut sink).await.unwrap();

    let first = rx.recv().await.unwrap();
    assert_eq!(first.item, "p1");
    assert!(!first.success);
    assert_eq!(first.message.as_deref(), Some("Invalid process"));
    assert_eq!(report.failed(), 2);
}
