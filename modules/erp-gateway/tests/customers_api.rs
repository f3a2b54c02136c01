#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Customers, tokens and the public routes through the full router

mod common;

use axum::body::Body;
use axum::http::{Method, StatusCode, header};
use common::{PASSWORD, TestApp, USERNAME, record};
use jsonwebtoken::{EncodingKey, Header, encode, get_current_timestamp};
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let request = app
        .request(Method::GET, "/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!({ "status": "ok" }));
    assert!(resp.header("x-request-id").is_some());
}

#[tokio::test]
async fn token_endpoint_issues_usable_token() {
    let app = TestApp::new();
    let request = app
        .request(Method::POST, "/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={USERNAME}&password={PASSWORD}")))
        .unwrap();

    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["token_type"], "bearer");
    assert_eq!(resp.body["expires_in"], 3600);

    let token = resp.body["access_token"].as_str().unwrap();
    let request = app
        .request(Method::GET, "/customers")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_unauthenticated() {
    let app = TestApp::new();
    let request = app
        .request(Method::POST, "/token")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={USERNAME}&password=guess")))
        .unwrap();

    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn resources_require_a_token() {
    let app = TestApp::new();
    let request = app
        .request(Method::GET, "/customers/1")
        .body(Body::empty())
        .unwrap();

    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.header("www-authenticate"), Some("Bearer"));
    assert_eq!(resp.header("content-type"), Some("application/problem+json"));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = TestApp::new();
    let now = get_current_timestamp();
    let claims = json!({ "sub": USERNAME, "iat": now - 7200, "exp": now - 3600 });
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::SECRET.as_bytes()),
    )
    .unwrap();

    let request = app
        .request(Method::GET, "/customers")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["detail"], "Token expired");
}

#[tokio::test]
async fn created_customer_reads_back_identically() {
    let app = TestApp::new();
    let created = app
        .post(
            "/customers",
            &json!({
                "name": "Ana Ruiz",
                "email": "ana@example.com",
                "phone": "+34 600 000 000",
                "company_type": "company"
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let id = created.body["id"].as_i64().unwrap();
    let fetched = app.get(&format!("/customers/{id}")).await;
    assert_eq!(fetched.status, StatusCode::OK);
    for field in ["name", "email", "phone", "company_type"] {
        assert_eq!(fetched.body[field], created.body[field], "{field}");
    }
    assert_eq!(fetched.body["phone"], "+34 600 000 000");
}

#[tokio::test]
async fn missing_phone_reads_back_as_null() {
    let app = TestApp::new();
    let created = app
        .post("/customers", &json!({ "name": "Bo", "email": "bo@example.com" }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["phone"], json!(null));
    assert_eq!(created.body["company_type"], "person");
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let app = TestApp::new();
    let resp = app.get("/customers/999").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn non_numeric_id_is_a_validation_error() {
    let app = TestApp::new();
    let resp = app.get("/customers/abc").await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn invalid_customer_never_reaches_the_backend() {
    let app = TestApp::new();
    let resp = app
        .post("/customers", &json!({ "name": " ", "email": "not-an-address" }))
        .await;

    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["code"], "VALIDATION_FAILED");
    let fields: Vec<&str> = resp.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "email"]);
    assert_eq!(app.backend.count("res.partner"), 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new();
    let request = app
        .request(Method::POST, "/customers")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let resp = app.send(request).await;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn customers_list_is_ordered_and_bounded() {
    let app = TestApp::new();
    for id in [3, 1, 2] {
        app.backend.insert(
            "res.partner",
            id,
            record(json!({ "name": format!("P{id}"), "email": format!("p{id}@example.com") })),
        );
    }

    let resp = app.get("/customers?limit=2&offset=1").await;
    assert_eq!(resp.status, StatusCode::OK);
    let ids: Vec<i64> = resp
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 3]);

    assert_eq!(
        app.get("/customers?limit=0").await.status,
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn unknown_route_is_a_problem() {
    let app = TestApp::new();
    let resp = app.get("/warehouses").await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.header("content-type"), Some("application/problem+json"));
    assert_eq!(resp.body["instance"], "/warehouses");
}
