//! `/api/me` tests: plan snapshot for the authenticated subject.

mod common;

use common::TestApp;

#[tokio::test]
async fn authenticated_subject_sees_plan_and_remaining() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(1000, 250);

    let response = app
        .client()
        .get(format!("{}/api/me", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["subject"], user_id.to_string());
    assert_eq!(body["email"], "reader@example.com");
    assert_eq!(body["plan"], "pro");
    assert_eq!(body["remaining"], 750);
}

#[tokio::test]
async fn subject_without_account_reads_as_no_plan() {
    let app = TestApp::spawn().await;
    let user_id = uuid::Uuid::new_v4(); // never seeded

    let response = app
        .client()
        .get(format!("{}/api/me", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .send()
        .await
        .expect("Failed to execute request");

    // The read path reports, it does not deny.
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["plan"], "none");
    assert_eq!(body["remaining"], 0);
}

#[tokio::test]
async fn me_matches_what_the_quota_check_computes() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(1000, 400);
    let token = app.bearer_token(user_id);

    let me: serde_json::Value = app
        .client()
        .get(format!("{}/api/me", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    let chat: serde_json::Value = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "text": "The quick brown fox jumps over the lazy dog." }))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    // The chat response echoes the pre-call snapshot; both paths read the
    // same store state, so the figures agree.
    assert_eq!(me["plan"], chat["plan"]["plan"]);
    assert_eq!(me["remaining"], chat["plan"]["remaining"]);
}

#[tokio::test]
async fn store_failure_on_read_is_an_error() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(1000, 0);
    app.store.set_fail_reads(true);

    let response = app
        .client()
        .get(format!("{}/api/me", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 500);
}
