//! Mock remote progress store for integration tests
//!
//! Wraps a wiremock server speaking the read/update protocol of the
//! remote store, plus helpers to build clients and coordinators that
//! point at it.

use escape_progress::client::{Config, RemoteProgressClient, SyncCoordinator};
use escape_progress::shared::{AppConfig, ProgressRecord};
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client configuration pointing at `server`
pub fn config_for(server: &MockServer, snapshot_dir: &Path) -> Config {
    Config::with_builder(
        AppConfig::builder()
            .remote_url(server.uri())
            .snapshot_dir(snapshot_dir)
            .request_timeout_secs(1),
    )
    .unwrap()
}

pub fn client_for(server: &MockServer) -> RemoteProgressClient {
    RemoteProgressClient::new(&config_for(server, Path::new(".")))
}

pub fn coordinator_for(server: &MockServer, snapshot_dir: &Path) -> SyncCoordinator {
    SyncCoordinator::new(&config_for(server, snapshot_dir))
}

/// Answer reads for `team` with `response`
pub async fn mount_read(server: &MockServer, team: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(query_param("action", "read"))
        .and(query_param("teamName", team))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Answer reads for `team` with the stored `record`
pub async fn mount_found(server: &MockServer, team: &str, record: &ProgressRecord) {
    let body = json!({ "found": true, "progress": serde_json::to_string(record).unwrap() });
    mount_read(server, team, ResponseTemplate::new(200).set_body_json(body)).await;
}

pub async fn mount_not_found(server: &MockServer, team: &str) {
    mount_read(server, team, ResponseTemplate::new(200).set_body_json(json!({ "found": false }))).await;
}

/// Answer every update with `response`
pub async fn mount_write(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_write_ok(server: &MockServer) {
    mount_write(
        server,
        ResponseTemplate::new(200).set_body_json(json!({ "success": true, "message": "Progress updated" })),
    )
    .await;
}

/// JSON bodies of every update received, in arrival order
pub async fn update_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == "POST")
        .map(|request| request.body_json::<Value>().unwrap())
        .collect()
}

/// Records carried by every update received, in arrival order
pub async fn written_records(server: &MockServer) -> Vec<ProgressRecord> {
    update_bodies(server)
        .await
        .iter()
        .map(|body| serde_json::from_str(body["progress"].as_str().unwrap()).unwrap())
        .collect()
}
