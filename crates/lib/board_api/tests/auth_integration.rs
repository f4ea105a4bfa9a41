//! Login and token guard behaviour over HTTP.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use board_core::auth::jwt;
use board_core::store;
use chrono::{Duration, Utc};
use common::{JWT_SECRET, TestApp};
use serde_json::json;

#[tokio::test]
async fn login_returns_token_and_stamps_time() {
    let t = TestApp::new().await;
    let resp = t
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "name": "admin", "password": "123456" })),
        )
        .await;

    assert_eq!(StatusCode::OK, resp.status);
    assert_eq!(Some("application/json; charset=utf-8"), resp.content_type.as_deref());
    assert!(resp.body.ends_with(b"\n"));
    let body = resp.json();
    assert_eq!(true, body["ok"]);

    let claims = jwt::decode_token(body["token"].as_str().unwrap(), JWT_SECRET, true).unwrap();
    assert_eq!(t.admin.id, claims.uid);
    assert!(claims.is_admin);

    let admin = store::users::get_by_id(&t.pool, t.admin.id).await.unwrap().unwrap();
    assert!(admin.login_time.is_some());
}

#[tokio::test]
async fn login_accepts_email() {
    let t = TestApp::new().await;
    let resp = t
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "name": "admin@example.com", "password": "123456" })),
        )
        .await;
    assert_eq!(StatusCode::OK, resp.status);
}

#[tokio::test]
async fn login_failures_are_forbidden() {
    let t = TestApp::new().await;

    let wrong = t
        .call(
            Method::POST,
            "/login",
            None,
            Some(json!({ "name": "admin", "password": "nope" })),
        )
        .await;
    assert_eq!(StatusCode::FORBIDDEN, wrong.status);
    assert_eq!(json!({ "ok": false, "message": "Authenticate failed." }), wrong.json());

    let empty = t.call(Method::POST, "/login", None, None).await;
    assert_eq!(StatusCode::FORBIDDEN, empty.status);
    assert_eq!("User name or password is required.", empty.message());

    let partial = t
        .call(Method::POST, "/login", None, Some(json!({ "name": "admin" })))
        .await;
    assert_eq!(StatusCode::FORBIDDEN, partial.status);
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let t = TestApp::new().await;
    let resp = t.call(Method::GET, "/servers", None, None).await;
    assert_eq!(StatusCode::UNAUTHORIZED, resp.status);
    assert_eq!("Token not found.", resp.message());
}

#[tokio::test]
async fn malformed_headers_are_classified() {
    let t = TestApp::new().await;
    let token = t.admin_token();
    let cases = [
        (format!("Bearer {token}"), "Invalid token header."),
        ("JWT".to_string(), "Token missing."),
        (format!("JWT {token} extra"), "Invalid token."),
    ];
    for (value, expected) in cases {
        let req = Request::builder()
            .uri("/servers")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();
        let resp = t.send(req).await;
        assert_eq!(StatusCode::UNAUTHORIZED, resp.status, "{expected}");
        assert_eq!(expected, resp.message());
    }
}

#[tokio::test]
async fn lowercase_scheme_is_accepted() {
    let t = TestApp::new().await;
    let req = Request::builder()
        .uri("/servers")
        .header(header::AUTHORIZATION, format!("jwt {}", t.admin_token()))
        .body(Body::empty())
        .unwrap();
    assert_eq!(StatusCode::OK, t.send(req).await.status);
}

#[tokio::test]
async fn bad_and_expired_tokens_are_forbidden() {
    let t = TestApp::new().await;

    let forged = jwt::issue_token(t.admin.id, true, "other-secret").unwrap();
    let resp = t.call(Method::GET, "/servers", Some(&forged), None).await;
    assert_eq!(StatusCode::FORBIDDEN, resp.status);

    let issued = Utc::now() - Duration::days(1) - Duration::minutes(1);
    let expired = jwt::issue_token_at(issued, t.admin.id, true, JWT_SECRET).unwrap();
    let resp = t.call(Method::GET, "/servers", Some(&expired), None).await;
    assert_eq!(StatusCode::FORBIDDEN, resp.status);
}

#[tokio::test]
async fn token_for_deleted_user_is_forbidden() {
    let t = TestApp::new().await;
    let (user, token) = t.user_token("ghost").await;
    store::users::delete(&t.pool, user.id).await.unwrap();

    let resp = t.call(Method::GET, "/servers/1", Some(&token), None).await;
    assert_eq!(StatusCode::FORBIDDEN, resp.status);
    assert_eq!("User not exists.", resp.message());
}

#[tokio::test]
async fn non_admin_gets_no_permission() {
    let t = TestApp::new().await;
    let (_, token) = t.user_token("viewer").await;
    for uri in ["/servers", "/users"] {
        let resp = t.call(Method::GET, uri, Some(&token), None).await;
        assert_eq!(StatusCode::FORBIDDEN, resp.status, "{uri}");
        assert_eq!(json!({ "ok": false, "message": "No permission." }), resp.json());
    }
}
