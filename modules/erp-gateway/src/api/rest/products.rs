//! Product representation: envelope, pagination links, sparse fields and
//! cache validators.

use std::time::SystemTime;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use erp_gateway_errors::Problem;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use super::dto::ProductListParams;
use crate::domain::products::{Product, ProductField, ProductPage};

pub const CACHE_CONTROL_VALUE: &str = "max-age=60, public";

/// Route prefix used when rendering links.
#[derive(Debug, Clone, Default)]
pub struct LinkBase(pub String);

impl LinkBase {
    #[must_use]
    pub fn product(&self, sku: &str) -> String {
        format!("{}/products/{}", self.0, urlencoding::encode(sku))
    }

    /// A listing link that keeps the caller's filters, sort and fields.
    #[must_use]
    pub fn listing(&self, params: &ProductListParams, number: usize, size: usize) -> String {
        let mut pairs = params.carried();
        pairs.push(("page[number]", number.to_string()));
        pairs.push(("page[size]", size.to_string()));
        // Pairs of plain strings always encode.
        let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
        format!("{}/products?{query}", self.0)
    }
}

fn field_value(product: &Product, field: ProductField) -> Value {
    match field {
        ProductField::Sku => json!(product.sku),
        ProductField::Name => json!(product.name),
        ProductField::StandardCost => json!(product.standard_cost),
        ProductField::ListPrice => json!(product.list_price),
        ProductField::Uom => json!(product.uom),
        ProductField::CategoryId => json!(product.category_id),
        ProductField::UpdatedAt => json!(product.updated_at.map(|t| t.to_rfc3339_opts(
            chrono::SecondsFormat::Secs,
            true
        ))),
        ProductField::Status => json!(product.status),
    }
}

/// One product as JSON, restricted to `selection` when given. Unknown
/// names in the selection are ignored; `_links` is always kept.
#[must_use]
pub fn render_item(product: &Product, base: &LinkBase, selection: Option<&[String]>) -> Value {
    let mut item = Map::new();
    for field in ProductField::ALL {
        let wanted = selection.is_none_or(|names| names.iter().any(|n| n == field.as_str()));
        if wanted {
            item.insert(field.as_str().to_owned(), field_value(product, field));
        }
    }
    item.insert("_links".to_owned(), json!({ "self": base.product(&product.sku) }));
    Value::Object(item)
}

#[must_use]
pub fn render_page(page: &ProductPage, params: &ProductListParams, base: &LinkBase) -> Value {
    let selection = params.field_selection();
    let data: Vec<Value> = page
        .items
        .iter()
        .map(|p| render_item(p, base, selection.as_deref()))
        .collect();

    let (number, size) = (page.page.number, page.page.size);
    let mut links = Map::new();
    links.insert("self".to_owned(), json!(base.listing(params, number, size)));
    if page.has_next() {
        links.insert("next".to_owned(), json!(base.listing(params, number + 1, size)));
    }
    if page.has_prev() {
        // A page past the end links back to the last real page.
        let last = page.total.div_ceil(size).max(1);
        let prev = (number - 1).min(last);
        links.insert("prev".to_owned(), json!(base.listing(params, prev, size)));
    }

    json!({
        "meta": {
            "total": page.total,
            "page": { "number": number, "size": size },
        },
        "links": links,
        "data": data,
    })
}

/// Quoted SHA-256 of the serialized body.
#[must_use]
pub fn entity_tag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Whether an `If-None-Match` header matches `etag` (weak comparison).
#[must_use]
pub fn not_modified(headers: &HeaderMap, etag: &str) -> bool {
    let strip = |tag: &str| tag.trim().trim_start_matches("W/").to_owned();
    let current = strip(etag);
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|candidate| candidate.trim() == "*" || strip(candidate) == current)
}

/// Serialize `body` with cache validators; `304` when the client already has it.
///
/// # Errors
/// [`Problem`] if the body cannot be serialized.
pub fn cached_json(
    request_headers: &HeaderMap,
    body: &Value,
    last_modified: Option<DateTime<Utc>>,
) -> Result<Response, Problem> {
    let bytes = serde_json::to_vec(body).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize product response");
        Problem::upstream("failed to serialize response")
    })?;
    let etag = entity_tag(&bytes);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    if let Some(value) = last_modified
        .map(|t| httpdate::fmt_http_date(SystemTime::from(t)))
        .and_then(|s| HeaderValue::from_str(&s).ok())
    {
        headers.insert(header::LAST_MODIFIED, value);
    }

    if not_modified(request_headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
    }

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok((StatusCode::OK, headers, Body::from(bytes)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::products::{PageRequest, ProductStatus};

    fn sample(sku: &str) -> Product {
        Product {
            sku: sku.to_owned(),
            name: "Shirt".to_owned(),
            standard_cost: Some(4.0),
            list_price: None,
            uom: Some("Units".to_owned()),
            category_id: Some(3),
            updated_at: None,
            status: ProductStatus::Active,
        }
    }

    #[test]
    fn selection_keeps_links() {
        let base = LinkBase("/api".to_owned());
        let item = render_item(
            &sample("SH-1"),
            &base,
            Some(&["sku".to_owned(), "bogus".to_owned()][..]),
        );
        assert_eq!(item, json!({ "sku": "SH-1", "_links": { "self": "/api/products/SH-1" } }));
    }

    #[test]
    fn sku_is_escaped_in_links() {
        let base = LinkBase::default();
        assert_eq!(base.product("A B/1"), "/products/A%20B%2F1");
    }

    #[test]
    fn listing_link_carries_filters() {
        let params = ProductListParams {
            q: Some("red shirt".to_owned()),
            sort: Some("-list_price".to_owned()),
            ..ProductListParams::default()
        };
        let link = LinkBase::default().listing(&params, 2, 5);
        assert_eq!(
            link,
            "/products?q=red+shirt&sort=-list_price&page%5Bnumber%5D=2&page%5Bsize%5D=5"
        );
    }

    #[test]
    fn links_depend_on_position() {
        let params = ProductListParams::default();
        let base = LinkBase::default();
        let page = |number, total| ProductPage {
            items: Vec::new(),
            total,
            page: PageRequest::new(number, 10).unwrap(),
            last_modified: None,
        };

        let first = render_page(&page(1, 25), &params, &base);
        assert!(first["links"].get("next").is_some());
        assert!(first["links"].get("prev").is_none());

        let last = render_page(&page(3, 25), &params, &base);
        assert!(last["links"].get("next").is_none());
        assert!(last["links"].get("prev").is_some());
        assert_eq!(last["meta"], json!({ "total": 25, "page": { "number": 3, "size": 10 } }));
    }

    #[test]
    fn if_none_match_forms() {
        let etag = entity_tag(b"{}");
        let mut headers = HeaderMap::new();
        assert!(!not_modified(&headers, &etag));

        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_str(&format!("\"other\", W/{etag}")).unwrap(),
        );
        assert!(not_modified(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(not_modified(&headers, &etag));
    }

    #[test]
    fn cached_json_sets_validators() {
        let body = json!({ "data": [] });
        let stamp = DateTime::parse_from_rfc3339("2025-05-24T12:15:23Z")
            .unwrap()
            .with_timezone(&Utc);
        let resp = cached_json(&HeaderMap::new(), &body, Some(stamp)).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], CACHE_CONTROL_VALUE);
        assert_eq!(
            resp.headers()[header::LAST_MODIFIED],
            "Sat, 24 May 2025 12:15:23 GMT"
        );
        let etag = resp.headers()[header::ETAG].to_str().unwrap();
        assert_eq!(etag.len(), 66);
    }
}
