use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use erp_gateway_auth::{TokenService, require_bearer};

use super::handlers;

/// Routes reachable without a token.
#[must_use]
pub fn public() -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/token", post(handlers::issue_token))
}

/// Resource routes, each behind the bearer gate.
#[must_use]
pub fn protected(tokens: Arc<TokenService>) -> Router {
    Router::new()
        .route(
            "/customers",
            post(handlers::create_customer).get(handlers::list_customers),
        )
        .route("/customers/{id}", get(handlers::get_customer))
        .route("/orders", post(handlers::create_order))
        .route("/orders/{id}", get(handlers::get_order))
        .route("/invoices/customers", post(handlers::create_customer_invoice))
        .route("/invoices/suppliers", post(handlers::create_supplier_invoice))
        .route("/deliveries", post(handlers::record_delivery))
        .route("/payments", post(handlers::create_payment))
        .route("/products", get(handlers::list_products))
        .route("/products/{sku}", get(handlers::get_product))
        .route_layer(from_fn_with_state(tokens, require_bearer))
}
