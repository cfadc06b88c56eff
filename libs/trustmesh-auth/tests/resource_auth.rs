#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the resource auth layer
//!
//! These tests verify that:
//! 1. A missing assertion header yields an anonymous context, not an error
//! 2. A present but corrupted assertion is rejected before any handler runs
//! 3. Authority guards see exactly the forwarded authorities

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
    routing::get,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use trustmesh_auth::{Authz, ResourceAuthLayer, authority_guard, problem::PROBLEM_CONTENT_TYPE};
use trustmesh_security::{
    AssertionCodec, IdentityAssertion, SecurityContext, constants::IDENTITY_ASSERTION_HEADER,
};

async fn whoami(Authz(ctx): Authz) -> Json<SecurityContext> {
    Json(ctx)
}

async fn r1(Authz(ctx): Authz) -> String {
    format!("{} accessed resource 1", ctx.subject().unwrap_or_default())
}

fn app(codec: AssertionCodec) -> Router {
    let gated = Router::new()
        .route("/r1", get(r1))
        .route_layer(middleware::from_fn_with_state("p2", authority_guard));

    Router::new()
        .route("/whoami", get(whoami))
        .merge(gated)
        .layer(ResourceAuthLayer::new(codec))
}

fn header_for(codec: &AssertionCodec, authorities: &[&str]) -> String {
    let assertion = IdentityAssertion::new(
        "wangchen",
        authorities.iter().map(|a| (*a).to_owned()).collect(),
        BTreeMap::from([("client_id".to_owned(), "c1".to_owned())]),
    )
    .unwrap();
    codec.encode(&assertion).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn absent_header_reaches_handler_as_anonymous() {
    let response = app(AssertionCodec::plain())
        .oneshot(Request::get("/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert!(json.get("subject").is_none());
    assert_eq!(json["authorities"], serde_json::json!([]));
}

#[tokio::test]
async fn corrupted_header_is_rejected_not_anonymous() {
    let response = app(AssertionCodec::plain())
        .oneshot(
            Request::get("/whoami")
                .header(IDENTITY_ASSERTION_HEADER, "not-a-valid-encoding")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        PROBLEM_CONTENT_TYPE
    );
    let body = body_string(response).await;
    assert!(body.contains("invalid_identity_assertion"));
    assert!(!body.contains("not-a-valid-encoding"));
}

#[tokio::test]
async fn granted_authority_reaches_resource() {
    let codec = AssertionCodec::plain();
    let value = header_for(&codec, &["p1", "p2"]);

    let response = app(codec)
        .oneshot(
            Request::get("/r1")
                .header(IDENTITY_ASSERTION_HEADER, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "wangchen accessed resource 1");
}

#[tokio::test]
async fn missing_authority_is_forbidden() {
    let codec = AssertionCodec::plain();
    let value = header_for(&codec, &["p1", "p3"]);

    let response = app(codec)
        .oneshot(
            Request::get("/r1")
                .header(IDENTITY_ASSERTION_HEADER, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn anonymous_on_gated_route_is_unauthorized() {
    let response = app(AssertionCodec::plain())
        .oneshot(Request::get("/r1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_layer_rejects_unsigned_assertion() {
    let plain = AssertionCodec::plain();
    let value = header_for(&plain, &["p2"]);
    let signed = AssertionCodec::signed(secrecy::SecretString::from("mesh-key".to_owned()));

    let response = app(signed)
        .oneshot(
            Request::get("/r1")
                .header(IDENTITY_ASSERTION_HEADER, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_layer_accepts_signed_assertion() {
    let signed = AssertionCodec::signed(secrecy::SecretString::from("mesh-key".to_owned()));
    let value = header_for(&signed, &["p2"]);

    let response = app(signed)
        .oneshot(
            Request::get("/r1")
                .header(IDENTITY_ASSERTION_HEADER, value)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
