#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Per-client-address rate limiting in front of every route

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use common::{TestApp, backend};
use erp_gateway::{RateLimitConfig, ServerConfig};

fn limited(requests: u32, window_secs: u64) -> TestApp {
    TestApp::with(
        backend(),
        ServerConfig::default(),
        &RateLimitConfig {
            requests,
            window_secs,
        },
    )
}

async fn health(app: &TestApp) -> common::TestResponse {
    let request = app
        .request(Method::GET, "/health")
        .body(Body::empty())
        .unwrap();
    app.send(request).await
}

#[tokio::test]
async fn request_beyond_the_limit_is_rejected() {
    let app = limited(3, 60);

    for remaining in ["2", "1", "0"] {
        let resp = health(&app).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.header("x-ratelimit-limit"), Some("3"));
        assert_eq!(resp.header("x-ratelimit-remaining"), Some(remaining));
    }

    let rejected = health(&app).await;
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(rejected.body["code"], "RATE_LIMITED");
    let retry_after: u64 = rejected.header("retry-after").unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));
}

#[tokio::test]
async fn limit_resets_after_the_window() {
    let app = limited(2, 1);

    assert_eq!(health(&app).await.status, StatusCode::OK);
    assert_eq!(health(&app).await.status, StatusCode::OK);
    assert_eq!(health(&app).await.status, StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(health(&app).await.status, StatusCode::OK);
    assert_eq!(health(&app).await.status, StatusCode::OK);
}

#[tokio::test]
async fn no_request_slips_through_later_in_the_same_window() {
    let app = limited(2, 4);

    assert_eq!(health(&app).await.status, StatusCode::OK);
    assert_eq!(health(&app).await.status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let rejected = health(&app).await;
    assert_eq!(rejected.status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = rejected.header("retry-after").unwrap().parse().unwrap();
    assert!((1..=2).contains(&retry_after));
}

#[tokio::test]
async fn clients_are_limited_independently() {
    let mut app = limited(1, 60);
    assert_eq!(health(&app).await.status, StatusCode::OK);
    assert_eq!(health(&app).await.status, StatusCode::TOO_MANY_REQUESTS);

    app.peer = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 4));
    assert_eq!(health(&app).await.status, StatusCode::OK);
}

#[tokio::test]
async fn limit_applies_before_authentication() {
    let app = limited(1, 60);
    let unauthenticated = || {
        app.request(Method::GET, "/customers")
            .body(Body::empty())
            .unwrap()
    };

    assert_eq!(app.send(unauthenticated()).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.send(unauthenticated()).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}
