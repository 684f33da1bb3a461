use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, Resource, ResourceWithConfigure,
    ResourceWithImportState,
};
use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};
use tfplug::SettleConfig;
use uptimerobot::api::Client;
use uptimerobot::resources::PspResource;
use uptimerobot::UptimeRobotProviderData;

const API_KEY: &str = "u1234-test";

fn fast_settle(timeout: Duration) -> SettleConfig {
    SettleConfig {
        timeout,
        required_matches: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

async fn resource_for(server: &ServerGuard, settle: SettleConfig) -> PspResource {
    tfplug::try_init_logging();
    let client = Client::new(&server.url(), API_KEY).unwrap();
    let mut resource = PspResource::new();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(Arc::new(UptimeRobotProviderData::new(client, settle))),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

fn plan(name: &str, monitor_ids: &[i64]) -> DynamicValue {
    DynamicValue::new(Dynamic::object([
        ("id", Dynamic::Unknown),
        ("url_key", Dynamic::Unknown),
        ("status", Dynamic::Unknown),
        ("name", Dynamic::string(name)),
        (
            "monitor_ids",
            Dynamic::set(monitor_ids.iter().map(|id| Dynamic::Number(*id as f64))),
        ),
        ("custom_domain", Dynamic::string("")),
        ("custom_settings", Dynamic::Null),
    ]))
}

fn read_request(state: DynamicValue, private: Vec<u8>) -> ReadResourceRequest {
    ReadResourceRequest {
        type_name: "uptimerobot_psp".to_string(),
        current_state: state,
        private,
        provider_meta: None,
        client_capabilities: ClientCapabilities::default(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn psp_lifecycle_with_mock_server() {
    let mut server = Server::new_async().await;
    let page = json!({
        "id": 101,
        "friendlyName": "Status",
        "urlKey": "abc123",
        "status": "ENABLED",
        "monitorIds": [1, 2],
        "customDomain": null
    });

    let create_mock = server
        .mock("POST", "/psps")
        .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
        .match_body(Matcher::PartialJson(json!({
            "friendlyName": "Status",
            "monitorIds": [1, 2],
            "customDomain": null
        })))
        .with_status(201)
        .with_body(page.to_string())
        .create_async()
        .await;
    let get_mock = server
        .mock("GET", "/psps/101")
        .with_body(json!({ "data": page }).to_string())
        .create_async()
        .await;

    let resource = resource_for(&server, fast_settle(Duration::from_secs(5))).await;

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "uptimerobot_psp".to_string(),
                planned_state: plan("Status", &[1, 2]),
                config: plan("Status", &[1, 2]),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    create_mock.assert_async().await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    let state = created.new_state.value.clone();
    assert_eq!(state.attr("id"), &Dynamic::string("101"));
    assert_eq!(state.attr("url_key"), &Dynamic::string("abc123"));
    assert_eq!(state.attr("custom_domain"), &Dynamic::string(""));

    let refreshed = resource
        .read(Context::new(), read_request(created.new_state, vec![]))
        .await;
    assert!(refreshed.diagnostics.is_empty());
    assert_eq!(refreshed.new_state.unwrap().value.attr("name"), &Dynamic::string("Status"));

    let delete_mock = server
        .mock("DELETE", "/psps/101")
        .with_status(204)
        .create_async()
        .await;
    get_mock.remove_async().await;
    let _gone_mock = server
        .mock("GET", "/psps/101")
        .with_status(404)
        .with_body(r#"{"message":"not found"}"#)
        .create_async()
        .await;

    let deleted = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "uptimerobot_psp".to_string(),
                prior_state: DynamicValue::new(state),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    delete_mock.assert_async().await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
}

#[tokio::test(flavor = "multi_thread")]
async fn create_with_unknown_monitor_is_rolled_back() {
    let mut server = Server::new_async().await;
    let page = json!({
        "id": 102,
        "friendlyName": "Status",
        "status": "ENABLED",
        "monitorIds": [1]
    });

    let _create_mock = server
        .mock("POST", "/psps")
        .with_status(201)
        .with_body(page.to_string())
        .create_async()
        .await;
    let _get_mock = server
        .mock("GET", "/psps/102")
        .with_body(page.to_string())
        .create_async()
        .await;
    let monitor_mock = server
        .mock("GET", "/monitors/2")
        .with_status(404)
        .create_async()
        .await;
    let rollback_mock = server
        .mock("DELETE", "/psps/102")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let resource = resource_for(&server, fast_settle(Duration::from_millis(300))).await;

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "uptimerobot_psp".to_string(),
                planned_state: plan("Status", &[1, 2]),
                config: plan("Status", &[1, 2]),
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;

    monitor_mock.assert_async().await;
    rollback_mock.assert_async().await;
    assert!(created.new_state.is_null());
    let error = created
        .diagnostics
        .iter()
        .find(|d| d.is_error())
        .expect("mismatch error");
    assert_eq!(error.summary, "Monitor IDs were not applied as requested");
    assert!(error.detail.contains("monitor 2 does not exist"));
}

#[tokio::test(flavor = "multi_thread")]
async fn import_then_read_adopts_remote_page() {
    let mut server = Server::new_async().await;
    let _get_mock = server
        .mock("GET", "/psps/77")
        .with_body(
            json!({
                "data": {
                    "id": 77,
                    "friendlyName": "Imported",
                    "urlKey": "imp",
                    "status": "PAUSED",
                    "sort": "a-z",
                    "customSettings": {
                        "features": { "showBars": true, "showCookieBar": false }
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resource = resource_for(&server, fast_settle(Duration::from_secs(1))).await;

    let imported = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "uptimerobot_psp".to_string(),
                id: "77".to_string(),
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    let stub = imported.imported_resources.into_iter().next().unwrap();

    let response = resource
        .read(Context::new(), read_request(stub.state, stub.private))
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.new_state.unwrap().value;
    assert_eq!(state.attr("name"), &Dynamic::string("Imported"));
    assert_eq!(state.attr("status"), &Dynamic::string("PAUSED"));
    assert_eq!(state.attr("sort"), &Dynamic::string("a-z"));
    assert_eq!(state.attr("monitor_ids"), &Dynamic::Set(vec![]));
    let features = state.attr("custom_settings").attr("features");
    assert_eq!(features.attr("show_bars"), &Dynamic::Bool(true));
    assert_eq!(features.attr("show_cookie_bar"), &Dynamic::Bool(false));
    assert_eq!(features.attr("hide_paused_monitors"), &Dynamic::Null);
}

#[tokio::test(flavor = "multi_thread")]
async fn read_maps_not_found_and_forbidden() {
    let mut server = Server::new_async().await;
    let _missing = server
        .mock("GET", "/psps/5")
        .with_status(404)
        .create_async()
        .await;
    let _forbidden = server
        .mock("GET", "/psps/6")
        .with_status(403)
        .with_body(r#"{"code":"PSP_FORBIDDEN","message":"status page belongs to another account"}"#)
        .create_async()
        .await;

    let resource = resource_for(&server, fast_settle(Duration::from_secs(1))).await;
    let state = |id: &str| DynamicValue::new(Dynamic::object([("id", Dynamic::string(id))]));

    let missing = resource
        .read(Context::new(), read_request(state("5"), vec![]))
        .await;
    assert!(missing.new_state.is_none());
    assert!(missing.diagnostics.is_empty());

    let forbidden = resource
        .read(Context::new(), read_request(state("6"), vec![]))
        .await;
    assert!(forbidden.new_state.is_some());
    assert_eq!(forbidden.diagnostics[0].summary, "Failed to read status page");
    assert!(forbidden.diagnostics[0].detail.contains("PSP_FORBIDDEN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn refresh_surfaces_domain_removed_on_server() {
    let mut server = Server::new_async().await;
    let _get_mock = server
        .mock("GET", "/psps/8")
        .with_body(
            json!({
                "id": 8,
                "friendlyName": "Status",
                "status": "ENABLED",
                "customDomain": null,
                "isPasswordSet": true
            })
            .to_string(),
        )
        .create_async()
        .await;

    let resource = resource_for(&server, fast_settle(Duration::from_secs(1))).await;
    let stored = DynamicValue::new(Dynamic::object([
        ("id", Dynamic::string("8")),
        ("name", Dynamic::string("Status")),
        ("status", Dynamic::string("ENABLED")),
        ("custom_domain", Dynamic::string("status.example.com")),
        ("password", Dynamic::string("hunter2")),
    ]));

    let response = resource
        .read(Context::new(), read_request(stored, vec![]))
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.new_state.unwrap().value;
    assert_eq!(state.attr("custom_domain"), &Dynamic::Null);
    assert_eq!(state.attr("password"), &Dynamic::string("hunter2"));
}
