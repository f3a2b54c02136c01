use std::sync::Arc;

use axum::Json;
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use erp_gateway_auth::{AuthError, Principal, TokenService};
use erp_rpc::RecordId;
use serde_json::json;
use tracing::info;

use super::dto::{
    CustomerRequest, DeliveryRequest, HealthResponse, InvoiceRequest, ListCustomersQuery,
    OrderRequest, PaymentRequest, ProductListParams, TokenRequest, TokenResponse,
};
use super::error::ApiResult;
use super::extract::{ValidForm, ValidJson, ValidPath, ValidQuery};
use super::products::{LinkBase, cached_json, render_item, render_page};
use crate::domain::models::{Customer, Delivery, Invoice, InvoiceKind, Order, Payment};
use crate::domain::service::Service;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// POST /token
///
/// Exchange the configured principal's credentials for a bearer token.
pub async fn issue_token(
    Extension(tokens): Extension<Arc<TokenService>>,
    ValidForm(req): ValidForm<TokenRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    tokens.authenticate(&req.username, &req.password)?;
    let issued = tokens.issue(&req.username)?;
    Ok(Json(issued.into()))
}

pub async fn create_customer(
    principal: Principal,
    Extension(svc): Extension<Arc<Service>>,
    ValidJson(req): ValidJson<CustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = svc.create_customer(req.into_domain()?).await?;
    info!(subject = %principal.subject, id = customer.id, "customer created via api");
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    Extension(svc): Extension<Arc<Service>>,
    ValidPath(id): ValidPath<RecordId>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(svc.get_customer(id).await?))
}

pub async fn list_customers(
    Extension(svc): Extension<Arc<Service>>,
    ValidQuery(query): ValidQuery<ListCustomersQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    let (limit, offset) = query.resolve()?;
    Ok(Json(svc.list_customers(limit, offset).await?))
}

pub async fn create_order(
    principal: Principal,
    Extension(svc): Extension<Arc<Service>>,
    ValidJson(req): ValidJson<OrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = svc.create_order(req.into_domain()?).await?;
    info!(subject = %principal.subject, id = order.id, "order created via api");
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    Extension(svc): Extension<Arc<Service>>,
    ValidPath(id): ValidPath<RecordId>,
) -> ApiResult<Json<Order>> {
    Ok(Json(svc.get_order(id).await?))
}

async fn create_invoice(
    svc: &Service,
    req: InvoiceRequest,
    kind: InvoiceKind,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = svc.create_invoice(req.into_domain(kind)?).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn create_customer_invoice(
    Extension(svc): Extension<Arc<Service>>,
    ValidJson(req): ValidJson<InvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    create_invoice(&svc, req, InvoiceKind::Customer).await
}

pub async fn create_supplier_invoice(
    Extension(svc): Extension<Arc<Service>>,
    ValidJson(req): ValidJson<InvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    create_invoice(&svc, req, InvoiceKind::Supplier).await
}

pub async fn record_delivery(
    Extension(svc): Extension<Arc<Service>>,
    ValidJson(req): ValidJson<DeliveryRequest>,
) -> ApiResult<Json<Delivery>> {
    Ok(Json(svc.record_delivery(req.into_domain()?).await?))
}

pub async fn create_payment(
    principal: Principal,
    Extension(svc): Extension<Arc<Service>>,
    ValidJson(req): ValidJson<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let payment = svc.create_payment(req.into_domain()?).await?;
    info!(subject = %principal.subject, id = payment.id, "payment registered via api");
    Ok((StatusCode::CREATED, Json(payment)))
}

/// GET /products
///
/// Filtered, sorted, paginated catalogue with cache validators.
pub async fn list_products(
    Extension(svc): Extension<Arc<Service>>,
    Extension(base): Extension<LinkBase>,
    headers: HeaderMap,
    ValidQuery(params): ValidQuery<ProductListParams>,
) -> ApiResult<Response> {
    let query = params.to_query()?;
    let page = svc.list_products(&query).await?;
    let body = render_page(&page, &params, &base);
    cached_json(&headers, &body, page.last_modified)
}

/// GET /products/{sku}
pub async fn get_product(
    Extension(svc): Extension<Arc<Service>>,
    Extension(base): Extension<LinkBase>,
    headers: HeaderMap,
    ValidPath(sku): ValidPath<String>,
) -> ApiResult<Response> {
    let product = svc.get_product(&sku).await?;
    let body = json!({
        "data": render_item(&product, &base, None),
        "links": { "self": base.product(&product.sku) },
    });
    cached_json(&headers, &body, product.updated_at)
}

/// Fallback for unknown routes, in the same problem format as everything else.
pub async fn not_found(uri: Uri) -> Response {
    erp_gateway_errors::Problem::not_found("No route matches this path")
        .with_instance(uri.path())
        .into_response()
}
