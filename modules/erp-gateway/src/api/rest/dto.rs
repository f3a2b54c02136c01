//! Request and response bodies, and their validation into domain inputs.

use chrono::{NaiveDate, Utc};
use erp_gateway_auth::IssuedToken;
use erp_rpc::RecordId;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Violations};
use crate::domain::fields::BACKEND_DATE;
use crate::domain::models::{
    CompanyType, DeliveryUpdate, InvoiceKind, LineItem, NewCustomer, NewInvoice, NewOrder,
    NewPayment,
};
use crate::domain::products::{
    PageRequest, ProductFilter, ProductQuery, ProductStatus, DEFAULT_PAGE_SIZE, parse_sort,
    parse_timestamp,
};

pub const DEFAULT_CUSTOMER_LIMIT: usize = 10;
pub const MAX_CUSTOMER_LIMIT: usize = 100;

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Structural address check: `local@domain.tld`, no whitespace.
fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

fn parse_date(violations: &mut Violations, field: &str, value: &str) -> Option<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(value, BACKEND_DATE).ok();
    violations.check(parsed.is_none(), field, "must be a date in YYYY-MM-DD format");
    parsed
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.token,
            token_type: "bearer",
            expires_in: issued.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    pub company_type: Option<String>,
}

impl CustomerRequest {
    /// # Errors
    /// [`DomainError::Validation`] listing every rejected field.
    pub fn into_domain(self) -> Result<NewCustomer, DomainError> {
        let mut v = Violations::default();
        v.check(is_blank(&self.name), "name", "must not be blank");
        v.check(!is_valid_email(&self.email), "email", "is not a valid email address");

        let company_type = match self.company_type.as_deref() {
            None => CompanyType::default(),
            Some("person") => CompanyType::Person,
            Some("company") => CompanyType::Company,
            Some(other) => {
                v.push(
                    "company_type",
                    format!("must be 'person' or 'company', got '{other}'"),
                );
                CompanyType::default()
            }
        };

        v.finish(NewCustomer {
            name: self.name.trim().to_owned(),
            email: self.email,
            phone: self.phone.filter(|p| !is_blank(p)),
            company_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListCustomersQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListCustomersQuery {
    /// `(limit, offset)` with defaults applied.
    ///
    /// # Errors
    /// [`DomainError::Validation`] when `limit` is outside `1..=100`.
    pub fn resolve(&self) -> Result<(usize, usize), DomainError> {
        let limit = self.limit.unwrap_or(DEFAULT_CUSTOMER_LIMIT);
        let mut v = Violations::default();
        v.check(
            !(1..=MAX_CUSTOMER_LIMIT).contains(&limit),
            "limit",
            format!("must be between 1 and {MAX_CUSTOMER_LIMIT}"),
        );
        v.finish((limit, self.offset.unwrap_or(0)))
    }
}

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub product_id: RecordId,
    pub quantity: f64,
    pub price_unit: f64,
}

fn validate_lines(v: &mut Violations, field: &str, lines: Vec<LineRequest>) -> Vec<LineItem> {
    v.check(lines.is_empty(), field, "must contain at least one line");
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            v.check(
                line.quantity <= 0.0,
                format!("{field}[{i}].quantity"),
                "must be greater than 0",
            );
            v.check(
                line.price_unit < 0.0,
                format!("{field}[{i}].price_unit"),
                "must not be negative",
            );
            LineItem {
                product_id: line.product_id,
                quantity: line.quantity,
                price_unit: line.price_unit,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub partner_id: RecordId,
    #[serde(default)]
    pub order_lines: Vec<LineRequest>,
}

impl OrderRequest {
    /// # Errors
    /// [`DomainError::Validation`] listing every rejected field.
    pub fn into_domain(self) -> Result<NewOrder, DomainError> {
        let mut v = Violations::default();
        let lines = validate_lines(&mut v, "order_lines", self.order_lines);
        v.finish(NewOrder {
            partner_id: self.partner_id,
            lines,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    pub partner_id: RecordId,
    #[serde(default)]
    pub invoice_lines: Vec<LineRequest>,
    pub invoice_date: Option<String>,
}

impl InvoiceRequest {
    /// # Errors
    /// [`DomainError::Validation`] listing every rejected field.
    pub fn into_domain(self, kind: InvoiceKind) -> Result<NewInvoice, DomainError> {
        let mut v = Violations::default();
        let lines = validate_lines(&mut v, "invoice_lines", self.invoice_lines);
        let invoice_date = self
            .invoice_date
            .as_deref()
            .and_then(|d| parse_date(&mut v, "invoice_date", d));
        v.finish(NewInvoice {
            kind,
            partner_id: self.partner_id,
            lines,
            invoice_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DeliveryRequest {
    pub order_id: RecordId,
    #[serde(default)]
    pub tracking_number: String,
    pub carrier: Option<String>,
}

impl DeliveryRequest {
    /// # Errors
    /// [`DomainError::Validation`] when the tracking number is blank.
    pub fn into_domain(self) -> Result<DeliveryUpdate, DomainError> {
        let mut v = Violations::default();
        v.check(is_blank(&self.tracking_number), "tracking_number", "must not be blank");
        v.finish(DeliveryUpdate {
            order_id: self.order_id,
            tracking_number: self.tracking_number.trim().to_owned(),
            carrier: self.carrier,
        })
    }
}

/// Any partner the caller sends is ignored; the invoice decides.
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub invoice_id: RecordId,
    pub amount: f64,
    pub payment_date: Option<String>,
    pub journal_id: RecordId,
}

impl PaymentRequest {
    /// # Errors
    /// [`DomainError::Validation`] listing every rejected field.
    pub fn into_domain(self) -> Result<NewPayment, DomainError> {
        let mut v = Violations::default();
        v.check(self.amount <= 0.0, "amount", "must be greater than 0");
        let payment_date = match self.payment_date.as_deref() {
            Some(d) => parse_date(&mut v, "payment_date", d),
            None => Some(Utc::now().date_naive()),
        };
        v.finish(NewPayment {
            invoice_id: self.invoice_id,
            amount: self.amount,
            payment_date: payment_date.unwrap_or_default(),
            journal_id: self.journal_id,
        })
    }
}

/// Raw `GET /products` parameters. Everything arrives as text so that a bad
/// value is reported against its own name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub q: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<String>,
    pub updated_since: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub fields: Option<String>,
    #[serde(rename = "page[number]")]
    pub page_number: Option<String>,
    #[serde(rename = "page[size]")]
    pub page_size: Option<String>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl ProductListParams {
    /// # Errors
    /// [`DomainError::Validation`] listing every rejected parameter.
    pub fn to_query(&self) -> Result<ProductQuery, DomainError> {
        let mut v = Violations::default();
        let mut filter = ProductFilter {
            q: present(self.q.as_ref()).map(str::to_owned),
            sku: present(self.sku.as_ref()).map(str::to_owned),
            ..ProductFilter::default()
        };

        if let Some(raw) = present(self.category_id.as_ref()) {
            match raw.parse::<RecordId>() {
                Ok(id) => filter.category_id = Some(id),
                Err(_) => v.push("category_id", "must be an integer"),
            }
        }
        if let Some(raw) = present(self.updated_since.as_ref()) {
            match parse_timestamp(raw) {
                Ok(ts) => filter.updated_since = Some(ts),
                Err(e) => absorb(&mut v, e),
            }
        }
        if let Some(raw) = present(self.status.as_ref()) {
            match ProductStatus::parse(raw) {
                Ok(status) => filter.status = Some(status),
                Err(e) => absorb(&mut v, e),
            }
        }

        let sort = match present(self.sort.as_ref()).map(parse_sort) {
            Some(Ok(keys)) => keys,
            Some(Err(e)) => {
                absorb(&mut v, e);
                Vec::new()
            }
            None => Vec::new(),
        };

        let number = parse_page_param(&mut v, "page[number]", self.page_number.as_ref(), 1);
        let size = parse_page_param(
            &mut v,
            "page[size]",
            self.page_size.as_ref(),
            DEFAULT_PAGE_SIZE,
        );
        let page = match PageRequest::new(number, size) {
            Ok(page) => page,
            Err(e) => {
                absorb(&mut v, e);
                PageRequest::default()
            }
        };

        v.finish(ProductQuery { filter, sort, page })
    }

    /// Requested output fields, `None` for all of them.
    #[must_use]
    pub fn field_selection(&self) -> Option<Vec<String>> {
        present(self.fields.as_ref()).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_owned)
                .collect()
        })
    }

    /// Parameters to carry into pagination links, in a fixed order.
    #[must_use]
    pub fn carried(&self) -> Vec<(&'static str, String)> {
        [
            ("q", self.q.as_ref()),
            ("sku", self.sku.as_ref()),
            ("category_id", self.category_id.as_ref()),
            ("updated_since", self.updated_since.as_ref()),
            ("status", self.status.as_ref()),
            ("sort", self.sort.as_ref()),
            ("fields", self.fields.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| present(value).map(|v| (name, v.to_owned())))
        .collect()
    }
}

fn parse_page_param(
    v: &mut Violations,
    field: &str,
    raw: Option<&String>,
    default: usize,
) -> usize {
    match present(raw) {
        None => default,
        Some(s) => s.parse::<usize>().unwrap_or_else(|_| {
            v.push(field, "must be a positive integer");
            default
        }),
    }
}

/// Move a validation error's violations into the collector.
fn absorb(v: &mut Violations, e: DomainError) {
    match e {
        DomainError::Validation(list) => {
            for violation in list {
                v.push(violation.field, violation.message);
            }
        }
        other => v.push("query", other.to_string()),
    }
}
