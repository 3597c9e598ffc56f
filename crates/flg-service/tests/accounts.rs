//! Account and profile integration tests.

mod common;

use axum::http::StatusCode;
use common::{bearer, token_for, TestHarness, AUDIENCE, JWT_SECRET};
use serde_json::json;

// ============================================================================
// Open account
// ============================================================================

#[tokio::test]
async fn open_account_creates_profile_and_balance() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({
            "username": "  romain ",
            "email": "romain@example.com",
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 0);
    assert_eq!(body["profile"]["username"], "romain");
    assert_eq!(body["profile"]["user_id"], harness.test_user_id.as_str());
}

#[tokio::test]
async fn open_account_twice_conflicts() {
    let harness = TestHarness::new();
    harness.open_account("romain").await;
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "username": "other", "email": "o@example.com" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn open_account_with_taken_username_conflicts() {
    let harness = TestHarness::new();
    harness.open_account("romain").await;
    let (name, value) = TestHarness::other_user_auth();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "username": "romain", "email": "x@example.com" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn open_account_with_blank_username_is_bad_request() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "username": "   ", "email": "x@example.com" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.store.accesses(), 0);
}

#[tokio::test]
async fn open_account_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .json(&json!({ "username": "romain", "email": "r@example.com" }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn token_for_wrong_audience_is_rejected() {
    let harness = TestHarness::new();
    let (name, value) = bearer(&token_for(
        harness.test_user_id.as_str(),
        "someone-else",
        JWT_SECRET,
    ));

    let response = harness
        .server
        .get("/v1/profile")
        .add_header(name, value)
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn token_with_wrong_signature_is_rejected() {
    let harness = TestHarness::new();
    let (name, value) = bearer(&token_for(
        harness.test_user_id.as_str(),
        AUDIENCE,
        "not-the-secret",
    ));

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header(name, value)
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn malformed_bearer_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/credits/balance")
        .add_header(
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        )
        .await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Profile
// ============================================================================

#[tokio::test]
async fn get_profile_before_opening_is_not_found() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .get("/v1/profile")
        .add_header(name, value)
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn get_profile_after_opening() {
    let harness = TestHarness::new();
    harness.open_account("romain").await;
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .get("/v1/profile")
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "romain");
    assert_eq!(body["email"], "romain@example.com");
    assert!(body.get("updated_at").is_none());
}

#[tokio::test]
async fn rename_and_set_avatar() {
    let harness = TestHarness::new();
    harness.open_account("romain").await;
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .patch("/v1/profile")
        .add_header(name, value)
        .json(&json!({
            "username": "flg",
            "avatar_url": "https://cdn.example.com/a.png",
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "flg");
    assert_eq!(body["avatar_url"], "https://cdn.example.com/a.png");
    assert!(body["updated_at"].is_string());

    // The old username is free again.
    let (name, value) = TestHarness::other_user_auth();
    harness
        .server
        .post("/v1/accounts")
        .add_header(name, value)
        .json(&json!({ "username": "romain", "email": "x@example.com" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn rename_to_taken_username_conflicts() {
    let harness = TestHarness::new();
    harness.open_account("romain").await;

    let (name, value) = TestHarness::other_user_auth();
    harness
        .server
        .post("/v1/accounts")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "username": "other", "email": "o@example.com" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = harness
        .server
        .patch("/v1/profile")
        .add_header(name, value)
        .json(&json!({ "username": "romain" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_without_profile_is_not_found() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_auth();

    let response = harness
        .server
        .patch("/v1/profile")
        .add_header(name, value)
        .json(&json!({ "avatar_url": "" }))
        .await;

    response.assert_status_not_found();
}
