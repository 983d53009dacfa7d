//! Liveness endpoint tests.

mod common;

use common::TestApp;

#[tokio::test]
async fn root_returns_ok_without_auth() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "summarize-service");
}

#[tokio::test]
async fn health_alias_returns_ok() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn liveness_probe_has_no_side_effects() {
    let app = TestApp::spawn().await;
    let client = app.client();

    client
        .get(&app.address)
        .send()
        .await
        .expect("Failed to execute request");

    // The probe must not touch the store or the provider.
    assert_eq!(app.store.read_count(), 0);
    assert_eq!(app.provider.calls(), 0);
}
