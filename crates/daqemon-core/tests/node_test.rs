#![allow(clippy::unwrap_used)]
// Node registration and profile loading against a mocked metering server.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use daqemon_api::{EmonApi, Endpoints, TransportConfig};
use daqemon_core::{ClientSection, CoreError, ProcessStep, ProfileMeta, Registration, load_profile, register_node};

async fn setup() -> (MockServer, EmonApi) {
    let server = MockServer::start().await;
    let key: SecretString = "apikey123".to_string().into();
    let api = EmonApi::new(&server.uri(), &key, Endpoints::default(), &TransportConfig::rest()).unwrap();
    (server, api)
}

fn client(deviceid: Option<i64>) -> ClientSection {
    ClientSection {
        nodeid: "emontx".into(),
        deviceid,
        kind: Some("daqemon".into()),
        ..ClientSection::default()
    }
}

#[tokio::test]
async fn test_create_assigns_numeric_id() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/create.json"))
        .and(query_param("nodeid", "emontx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(17)))
        .expect(1)
        .mount(&server)
        .await;

    let mut c = client(None);
    let reg = register_node(&api, &mut c).await.unwrap();
    assert_eq!(reg, Registration::Created(17));
    assert_eq!(c.deviceid, Some(17));
}

#[tokio::test]
async fn test_refused_create_adopts_existing_node() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/create.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Device already exists"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/device/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "4", "nodeid": "other"},
            {"id": "8", "nodeid": "emontx"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut c = client(None);
    let reg = register_node(&api, &mut c).await.unwrap();
    assert_eq!(reg, Registration::Adopted(8));
    assert_eq!(c.deviceid, Some(8));
}

#[tokio::test]
async fn test_refused_create_without_match_fails() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/create.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Invalid nodeid"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/device/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = register_node(&api, &mut client(None)).await.unwrap_err();
    assert!(matches!(err, CoreError::NodeRegistration { ref message } if message == "Invalid nodeid"));
}

#[tokio::test]
async fn test_update_keeps_id() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/set.json"))
        .and(query_param("id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut c = client(Some(5));
    assert_eq!(register_node(&api, &mut c).await.unwrap(), Registration::Updated(5));
    assert_eq!(c.deviceid, Some(5));
}

#[tokio::test]
async fn test_numeric_answer_to_update_is_not_a_creation() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/set.json"))
        .and(query_param("id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(5)))
        .expect(1)
        .mount(&server)
        .await;

    let mut c = client(Some(5));
    assert_eq!(register_node(&api, &mut c).await.unwrap(), Registration::Updated(5));
    assert_eq!(c.deviceid, Some(5));
}

#[tokio::test]
async fn test_refused_update_clears_stale_id() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/set.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Device does not exist"})),
        )
        .mount(&server)
        .await;

    let mut c = client(Some(5));
    let reg = register_node(&api, &mut c).await.unwrap();
    assert_eq!(
        reg,
        Registration::Cleared {
            message: Some("Device does not exist".into())
        }
    );
    assert_eq!(c.deviceid, None);
}

#[tokio::test]
async fn test_load_profile_stores_meta() {
    let (server, api) = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/template/get.json"))
        .and(query_param("type", "daqemon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "DAQEMON",
            "meta": {"engine": 11, "processes": {"multirate": "process__multirate"}}
        })))
        .mount(&server)
        .await;

    let mut meta = ProfileMeta::default();
    let profile = load_profile(&api, "daqemon", &mut meta).await.unwrap();
    assert_eq!(profile.engine, 11);
    assert_eq!(profile.method(ProcessStep::MultiRate), Some("process__multirate"));
    assert_eq!(profile.method(ProcessStep::Log), Some("process__log_to_feed"));
    assert_eq!(meta.engine, Some(11));
}
