//! End-to-end `/api/chat` scenarios against the in-memory store and the
//! mock provider.

mod common;

use common::{TestApp, MOCK_SNIPPETS, TEST_API_KEY};
use summarize_service::services::providers::{MockChatProvider, MockFailure};

fn chat_body(text: &str) -> serde_json::Value {
    serde_json::json!({ "text": text })
}

#[tokio::test]
async fn under_quota_request_succeeds_and_records_usage() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["snippet_count"], 3);
    assert_eq!(body["snippets"][0], "First insight.");
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert!(body["usage"]["total_tokens"].as_i64().unwrap() > 0);

    // Exactly one usage record, carrying the model and a positive count.
    let usage = app.store.usage();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].user_id, user_id);
    assert_eq!(usage[0].model, "gpt-3.5-turbo");
    assert!(usage[0].token_count > 0);
}

#[tokio::test]
async fn format_and_persona_are_accepted() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&serde_json::json!({
            "text": "Some long-form content worth summarizing.",
            "format": "bullet points",
            "persona": "casual"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn empty_text_is_400_and_reaches_nothing() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body(""))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    assert_eq!(app.store.read_count(), 0);
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn whitespace_only_text_is_400() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("   \n\t  "))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn expired_token_is_401_before_any_store_read() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.expired_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);
    assert_eq!(app.store.read_count(), 0);
    assert!(app.store.usage().is_empty());
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn subject_at_limit_is_403_and_upstream_is_never_called() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(1000, 1000);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 403);
    assert_eq!(app.provider.calls(), 0);
    assert!(app.store.usage().is_empty());
}

#[tokio::test]
async fn subject_without_plan_is_403() {
    let app = TestApp::spawn().await;
    let user_id = uuid::Uuid::new_v4(); // authenticated, but no account row

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 403);
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn upstream_failure_is_502_and_no_usage_is_written() {
    let app = TestApp::spawn_with_provider(MockChatProvider::fail_with(MockFailure::Api)).await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 502);
    assert_eq!(app.provider.calls(), 1);
    assert!(app.store.usage().is_empty());

    // The upstream error detail must not leak the provider credential.
    let body = response.text().await.expect("Failed to read body");
    assert!(!body.contains(TEST_API_KEY));
}

#[tokio::test]
async fn upstream_rate_limit_also_surfaces_as_502() {
    let app =
        TestApp::spawn_with_provider(MockChatProvider::fail_with(MockFailure::RateLimited)).await;
    let user_id = app.seed_subject(10_000, 0);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 502);
    assert!(app.store.usage().is_empty());
}

#[tokio::test]
async fn store_failure_before_the_call_fails_closed() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);
    app.store.set_fail_reads(true);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    // Authorization could not be confirmed, so the call is not made.
    assert_eq!(response.status(), 500);
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn store_failure_after_the_call_fails_open() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);
    app.store.set_fail_writes(true);

    let response = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request");

    // The response was already produced; a bookkeeping fault must not
    // unwind it.
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["snippets"].as_array().unwrap().len(), 3);
    assert!(app.store.usage().is_empty());
}

#[tokio::test]
async fn remaining_allowance_shrinks_across_requests() {
    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);
    let token = app.bearer_token(user_id);

    let first: serde_json::Value = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(&token)
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    let second: serde_json::Value = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(&token)
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    let first_remaining = first["plan"]["remaining"].as_i64().unwrap();
    let second_remaining = second["plan"]["remaining"].as_i64().unwrap();
    assert!(second_remaining < first_remaining);
    assert_eq!(app.store.usage().len(), 2);
}

#[tokio::test]
async fn mock_snippets_round_trip_through_the_parser() {
    // Guard the canned payload against drift: three separator-delimited
    // snippets in, three snippets out.
    assert_eq!(MOCK_SNIPPETS.matches("---").count(), 2);

    let app = TestApp::spawn().await;
    let user_id = app.seed_subject(10_000, 0);

    let body: serde_json::Value = app
        .client()
        .post(format!("{}/api/chat", app.address))
        .bearer_auth(app.bearer_token(user_id))
        .json(&chat_body("The quick brown fox jumps over the lazy dog."))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .expect("Failed to parse JSON");

    assert_eq!(
        body["snippets"],
        serde_json::json!(["First insight.", "Second insight.", "Third insight."])
    );
}
