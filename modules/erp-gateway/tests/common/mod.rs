#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use erp_gateway::{Gateway, RateLimitConfig, ServerConfig};
use erp_gateway_auth::{AuthConfig, PrincipalConfig, TokenService};
use erp_rpc::{InMemoryRecordClient, Record};
use jsonwebtoken::Algorithm;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "integration-secret";
pub const USERNAME: &str = "sbo";
pub const PASSWORD: &str = "sbo-password";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SecretString::from(SECRET.to_owned()),
        jwt_algorithm: Algorithm::HS256,
        expire_minutes: 60,
        leeway_seconds: 0,
        principal: PrincipalConfig {
            username: USERNAME.to_owned(),
            password: SecretString::from(PASSWORD.to_owned()),
        },
    }
}

pub fn backend() -> InMemoryRecordClient {
    erp_gateway::in_memory_backend()
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Value::Null` for an empty body.
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub struct TestApp {
    pub backend: Arc<InMemoryRecordClient>,
    pub tokens: Arc<TokenService>,
    pub router: Router,
    pub peer: IpAddr,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(backend(), ServerConfig::default(), &relaxed_limit())
    }

    pub fn with_backend(backend: InMemoryRecordClient) -> Self {
        Self::with(backend, ServerConfig::default(), &relaxed_limit())
    }

    pub fn with(
        backend: InMemoryRecordClient,
        server: ServerConfig,
        rate_limit: &RateLimitConfig,
    ) -> Self {
        let backend = Arc::new(backend);
        let gateway = Gateway::new(backend.clone(), server, auth_config(), rate_limit).unwrap();
        Self {
            backend,
            tokens: gateway.tokens(),
            router: gateway.router(),
            peer: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10)),
        }
    }

    pub fn token(&self) -> String {
        self.tokens.issue(USERNAME).unwrap().token
    }

    pub fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(SocketAddr::new(self.peer, 40_000)))
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Authorized GET.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = self
            .request(Method::GET, uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token()))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Authorized JSON POST.
    pub async fn post(&self, uri: &str, body: &Value) -> TestResponse {
        let request = self
            .request(Method::POST, uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

pub fn relaxed_limit() -> RateLimitConfig {
    RateLimitConfig {
        requests: 10_000,
        window_secs: 60,
    }
}
