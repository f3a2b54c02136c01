//! Router composition and the HTTP middleware stack.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::{HeaderName, StatusCode};
use axum::middleware::from_fn_with_state;
use erp_gateway_auth::{AuthConfig, TokenService};
use erp_rpc::{InMemoryRecordClient, RecordClient};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::api::rest::handlers;
use crate::api::rest::products::LinkBase;
use crate::api::rest::routes;
use crate::config::{RateLimitConfig, ServerConfig};
use crate::domain::fields::{Models, MoveFields, OrderFields, PaymentFields};
use crate::domain::service::Service;
use crate::middleware::rate_limit::{ClientRateLimiter, limit_by_client_ip};

pub const X_REQUEST_ID: &str = "x-request-id";

/// An empty in-process backend that understands the line and invoice
/// relations the gateway writes through.
#[must_use]
pub fn in_memory_backend() -> InMemoryRecordClient {
    InMemoryRecordClient::new()
        .with_relation(Models::SALE_ORDER, OrderFields::LINES, Models::SALE_ORDER_LINE)
        .with_relation(Models::MOVE, MoveFields::LINES, Models::MOVE_LINE)
        .with_relation(Models::PAYMENT, PaymentFields::INVOICES, Models::MOVE)
}

/// Everything the HTTP surface needs, built once at startup.
#[derive(Debug, Clone)]
pub struct Gateway {
    service: Arc<Service>,
    tokens: Arc<TokenService>,
    limiter: Arc<ClientRateLimiter>,
    server: ServerConfig,
}

impl Gateway {
    /// # Errors
    /// Returns an error if the token or rate-limit settings are unusable.
    pub fn new(
        client: Arc<dyn RecordClient>,
        server: ServerConfig,
        auth: AuthConfig,
        rate_limit: &RateLimitConfig,
    ) -> Result<Self> {
        let limiter = ClientRateLimiter::from_config(rate_limit)
            .context("invalid rate limit configuration")?;
        let tokens = TokenService::new(auth).context("invalid auth configuration")?;

        Ok(Self {
            service: Arc::new(Service::new(client)),
            tokens: Arc::new(tokens),
            limiter: Arc::new(limiter),
            server,
        })
    }

    #[must_use]
    pub fn tokens(&self) -> Arc<TokenService> {
        Arc::clone(&self.tokens)
    }

    /// The full application: routes under `base_path` wrapped in the middleware stack.
    #[must_use]
    pub fn router(&self) -> Router {
        let base_path = self.server.base_path.trim_end_matches('/').to_owned();

        let api = routes::public().merge(routes::protected(Arc::clone(&self.tokens)));
        let router = if base_path.is_empty() {
            api
        } else {
            Router::new().nest(&base_path, api)
        };

        let router = router
            .fallback(handlers::not_found)
            .layer(Extension(Arc::clone(&self.service)))
            .layer(Extension(Arc::clone(&self.tokens)))
            .layer(Extension(LinkBase(base_path)));

        self.apply_middleware_stack(router)
    }

    // Registration order is the reverse of execution. At runtime, outermost first:
    //   1. SetRequestId
    //   2. PropagateRequestId
    //   3. Trace
    //   4. Timeout
    //   5. BodyLimit
    //   6. RateLimit (per client address, before auth)
    //   7. Auth (route layer on resource routes)
    //   8. Router
    fn apply_middleware_stack(&self, mut router: Router) -> Router {
        router = router.layer(from_fn_with_state(
            Arc::clone(&self.limiter),
            limit_by_client_ip,
        ));

        router = router.layer(RequestBodyLimitLayer::new(self.server.body_limit_bytes));
        router = router.layer(DefaultBodyLimit::max(self.server.body_limit_bytes));

        router = router.layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            Duration::from_millis(self.server.request_timeout_ms),
        ));

        router = Self::apply_trace_layer(router);

        let x_request_id = HeaderName::from_static(X_REQUEST_ID);
        router = router.layer(PropagateRequestIdLayer::new(x_request_id.clone()));
        router.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    fn apply_trace_layer(router: Router) -> Router {
        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                    let rid = req
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("n/a");

                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri().path(),
                        version = ?req.version(),
                        request_id = %rid,
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<axum::body::Body>,
                     latency: Duration,
                     span: &tracing::Span| {
                        span.record("status", res.status().as_u16());
                        span.record("latency_ms", latency.as_millis());
                    },
                ),
        )
    }
}
