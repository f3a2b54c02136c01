//! Product catalogue: filters pushed down to the backend, then stable
//! multi-key sort and pagination over the filtered set.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use erp_rpc::{Condition, Domain, FindOptions, Operator, Record, RecordId, escape_like};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::domain::error::{DomainError, Violations};
use crate::domain::fields::{self, BACKEND_DATETIME, Models, ProductFields};
use crate::domain::service::Service;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl ProductStatus {
    /// # Errors
    /// [`DomainError::Validation`] for anything but `active` or `inactive`.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(DomainError::invalid(
                "status",
                format!("must be 'active' or 'inactive', got '{other}'"),
            )),
        }
    }
}

/// Canonical product shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub standard_cost: Option<f64>,
    pub list_price: Option<f64>,
    pub uom: Option<String>,
    pub category_id: Option<RecordId>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: ProductStatus,
}

impl Product {
    pub(crate) fn from_record(row: &Record) -> Self {
        let active = row
            .get(ProductFields::ACTIVE)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(true);
        Self {
            sku: fields::text(row, ProductFields::CODE).unwrap_or_default(),
            name: fields::text(row, ProductFields::NAME).unwrap_or_default(),
            standard_cost: fields::number(row, ProductFields::STANDARD_PRICE),
            list_price: fields::number(row, ProductFields::LIST_PRICE),
            uom: fields::many2one_name(row, ProductFields::UOM),
            category_id: fields::many2one_id(row, ProductFields::CATEGORY),
            updated_at: fields::text(row, ProductFields::WRITE_DATE)
                .and_then(|s| parse_backend_datetime(&s)),
            status: if active {
                ProductStatus::Active
            } else {
                ProductStatus::Inactive
            },
        }
    }
}

fn parse_backend_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Parse an `updated_since` bound: RFC 3339, a naive UTC datetime, or a date.
///
/// # Errors
/// [`DomainError::Validation`] when none of the formats match.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }
    if let Some(start) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(start.and_utc());
    }
    Err(DomainError::invalid(
        "updated_since",
        format!("'{value}' is not an ISO 8601 timestamp"),
    ))
}

/// Output fields, which are also the sortable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Sku,
    Name,
    StandardCost,
    ListPrice,
    Uom,
    CategoryId,
    UpdatedAt,
    Status,
}

impl ProductField {
    pub const ALL: [Self; 8] = [
        Self::Sku,
        Self::Name,
        Self::StandardCost,
        Self::ListPrice,
        Self::Uom,
        Self::CategoryId,
        Self::UpdatedAt,
        Self::Status,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sku => "sku",
            Self::Name => "name",
            Self::StandardCost => "standard_cost",
            Self::ListPrice => "list_price",
            Self::Uom => "uom",
            Self::CategoryId => "category_id",
            Self::UpdatedAt => "updated_at",
            Self::Status => "status",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

fn cmp_option<T>(a: Option<&T>, b: Option<&T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => cmp(x, y),
    }
}

fn compare(a: &Product, b: &Product, field: ProductField) -> Ordering {
    match field {
        ProductField::Sku => a.sku.cmp(&b.sku),
        ProductField::Name => a.name.cmp(&b.name),
        ProductField::StandardCost => {
            cmp_option(a.standard_cost.as_ref(), b.standard_cost.as_ref(), f64::total_cmp)
        }
        ProductField::ListPrice => {
            cmp_option(a.list_price.as_ref(), b.list_price.as_ref(), f64::total_cmp)
        }
        ProductField::Uom => cmp_option(a.uom.as_ref(), b.uom.as_ref(), Ord::cmp),
        ProductField::CategoryId => {
            cmp_option(a.category_id.as_ref(), b.category_id.as_ref(), Ord::cmp)
        }
        ProductField::UpdatedAt => {
            cmp_option(a.updated_at.as_ref(), b.updated_at.as_ref(), Ord::cmp)
        }
        ProductField::Status => a.status.cmp(&b.status),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: ProductField,
    pub descending: bool,
}

/// Parse `name,-list_price,+sku`.
///
/// # Errors
/// [`DomainError::Validation`] naming the first unknown field.
pub fn parse_sort(spec: &str) -> Result<Vec<SortKey>, DomainError> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (descending, name) = match part.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, part.strip_prefix('+').unwrap_or(part)),
            };
            ProductField::from_name(name)
                .map(|field| SortKey { field, descending })
                .ok_or_else(|| DomainError::invalid("sort", format!("unknown sort field '{name}'")))
        })
        .collect()
}

/// Stable sorts applied right to left, so the leftmost key decides last.
pub fn sort_products(items: &mut [Product], keys: &[SortKey]) {
    for key in keys.iter().rev() {
        items.sort_by(|a, b| {
            let ord = compare(a, b, key.field);
            if key.descending { ord.reverse() } else { ord }
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub sku: Option<String>,
    pub category_id: Option<RecordId>,
    pub updated_since: Option<DateTime<Utc>>,
    pub status: Option<ProductStatus>,
}

impl ProductFilter {
    /// Backend domain for this filter. Archived products are included
    /// unless a status narrows the set.
    pub fn to_domain(&self) -> Domain {
        let mut domain = Domain::all();
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            let needle = escape_like(q);
            domain = domain.with_any(vec![
                Condition::new(ProductFields::NAME, Operator::ILike, needle.as_str()),
                Condition::new(ProductFields::CODE, Operator::ILike, needle),
            ]);
        }
        if let Some(sku) = &self.sku {
            domain = domain.with(ProductFields::CODE, Operator::Eq, sku.as_str());
        }
        if let Some(category) = self.category_id {
            domain = domain.with(ProductFields::CATEGORY, Operator::Eq, category);
        }
        if let Some(since) = self.updated_since {
            domain = domain.with(
                ProductFields::WRITE_DATE,
                Operator::Ge,
                whole_second_ceiling(since)
                    .format(BACKEND_DATETIME)
                    .to_string(),
            );
        }
        match self.status {
            Some(status) => {
                let active = status == ProductStatus::Active;
                domain.with(ProductFields::ACTIVE, Operator::Eq, active)
            }
            None => domain.with(ProductFields::ACTIVE, Operator::In, json!([true, false])),
        }
    }
}

/// Backend timestamps have whole seconds; a fractional lower bound must not
/// admit the second it falls in.
fn whole_second_ceiling(t: DateTime<Utc>) -> DateTime<Utc> {
    if t.nanosecond() == 0 {
        return t;
    }
    t.with_nanosecond(0)
        .and_then(|floor| floor.checked_add_signed(TimeDelta::seconds(1)))
        .unwrap_or(t)
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: usize,
    pub size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// # Errors
    /// [`DomainError::Validation`] when `number` is 0 or `size` is outside `1..=200`.
    pub fn new(number: usize, size: usize) -> Result<Self, DomainError> {
        let mut violations = Violations::default();
        violations.check(number == 0, "page[number]", "must be at least 1");
        violations.check(
            !(1..=MAX_PAGE_SIZE).contains(&size),
            "page[size]",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        );
        violations.finish(Self { number, size })
    }

    #[must_use]
    pub fn start(&self) -> usize {
        (self.number - 1).saturating_mul(self.size)
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.start().saturating_add(self.size)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: Vec<SortKey>,
    pub page: PageRequest,
}

/// One page of the filtered, sorted catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub items: Vec<Product>,
    /// Matching products before pagination.
    pub total: usize,
    pub page: PageRequest,
    /// Latest `updated_at` across the whole filtered set.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ProductPage {
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page.end() < self.total
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page.start() > 0
    }
}

impl Service {
    /// # Errors
    /// [`DomainError::Upstream`] if the backend fails.
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        let domain = query.filter.to_domain();
        debug!(model = Models::PRODUCT, ?query, "listing products");

        let rows = self
            .client()
            .find(
                Models::PRODUCT,
                &domain,
                ProductFields::READ,
                FindOptions::default().order("id"),
            )
            .await?;

        let mut products: Vec<Product> = rows.iter().map(Product::from_record).collect();
        sort_products(&mut products, &query.sort);

        let total = products.len();
        let last_modified = products.iter().filter_map(|p| p.updated_at).max();
        let items = products
            .into_iter()
            .skip(query.page.start())
            .take(query.page.size)
            .collect();

        Ok(ProductPage {
            items,
            total,
            page: query.page,
            last_modified,
        })
    }

    /// # Errors
    /// [`DomainError::NotFound`] when no product, active or archived, has this SKU.
    pub async fn get_product(&self, sku: &str) -> Result<Product, DomainError> {
        let filter = ProductFilter {
            sku: Some(sku.to_owned()),
            ..ProductFilter::default()
        };
        let rows = self
            .client()
            .find(
                Models::PRODUCT,
                &filter.to_domain(),
                ProductFields::READ,
                FindOptions::default().limit(1),
            )
            .await?;

        rows.first()
            .map(Product::from_record)
            .ok_or_else(|| DomainError::not_found("product", sku))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(sku: &str, name: &str, price: Option<f64>) -> Product {
        Product {
            sku: sku.to_owned(),
            name: name.to_owned(),
            standard_cost: None,
            list_price: price,
            uom: None,
            category_id: None,
            updated_at: None,
            status: ProductStatus::Active,
        }
    }

    fn skus(items: &[Product]) -> Vec<&str> {
        items.iter().map(|p| p.sku.as_str()).collect()
    }

    #[test]
    fn parse_sort_handles_prefixes() {
        let keys = parse_sort("-list_price,+name,sku").unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey { field: ProductField::ListPrice, descending: true },
                SortKey { field: ProductField::Name, descending: false },
                SortKey { field: ProductField::Sku, descending: false },
            ]
        );
        assert!(parse_sort("").unwrap().is_empty());
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let err = parse_sort("name,colour").unwrap_err();
        assert!(matches!(err, DomainError::Validation(v) if v[0].field == "sort"));
    }

    #[test]
    fn right_to_left_matches_lexicographic_sort() {
        let mut items = vec![
            product("d", "b", Some(2.0)),
            product("a", "a", Some(2.0)),
            product("c", "b", Some(1.0)),
            product("b", "a", None),
            product("e", "b", Some(2.0)),
        ];
        let keys = parse_sort("name,-list_price").unwrap();

        let mut expected = items.clone();
        expected.sort_by(|x, y| {
            compare(x, y, ProductField::Name)
                .then_with(|| compare(x, y, ProductField::ListPrice).reverse())
        });

        sort_products(&mut items, &keys);
        assert_eq!(skus(&items), skus(&expected));
        assert_eq!(skus(&items), vec!["a", "b", "d", "e", "c"]);
    }

    #[test]
    fn nulls_sort_first_ascending() {
        let mut items = vec![product("x", "x", Some(1.0)), product("y", "y", None)];
        sort_products(&mut items, &parse_sort("list_price").unwrap());
        assert_eq!(skus(&items), vec!["y", "x"]);
    }

    #[test]
    fn page_bounds() {
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, 201).is_err());
        let page = PageRequest::new(3, 20).unwrap();
        assert_eq!((page.start(), page.end()), (40, 60));
    }

    #[test]
    fn both_page_violations_are_reported() {
        match PageRequest::new(0, 500) {
            Err(DomainError::Validation(v)) => assert_eq!(v.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn filter_without_status_includes_archived() {
        let domain = ProductFilter::default().to_domain();
        assert_eq!(
            serde_json::to_value(&domain).unwrap(),
            json!([["active", "in", [true, false]]])
        );
    }

    #[test]
    fn text_search_is_a_disjunction() {
        let filter = ProductFilter {
            q: Some("cam".to_owned()),
            status: Some(ProductStatus::Inactive),
            ..ProductFilter::default()
        };
        assert_eq!(
            serde_json::to_value(filter.to_domain()).unwrap(),
            json!([
                "|",
                ["name", "ilike", "cam"],
                ["default_code", "ilike", "cam"],
                ["active", "=", false]
            ])
        );
    }

    #[test]
    fn search_text_is_matched_literally() {
        let filter = ProductFilter {
            q: Some("50%_off".to_owned()),
            status: Some(ProductStatus::Active),
            ..ProductFilter::default()
        };
        assert_eq!(
            serde_json::to_value(filter.to_domain()).unwrap(),
            json!([
                "|",
                ["name", "ilike", "50\\%\\_off"],
                ["default_code", "ilike", "50\\%\\_off"],
                ["active", "=", true]
            ])
        );
    }

    #[test]
    fn fractional_updated_since_rounds_up() {
        let filter = |since: &str| ProductFilter {
            updated_since: Some(parse_timestamp(since).unwrap()),
            status: Some(ProductStatus::Active),
            ..ProductFilter::default()
        };
        assert_eq!(
            serde_json::to_value(filter("2025-05-20T08:00:00.5Z").to_domain()).unwrap()[0],
            json!(["write_date", ">=", "2025-05-20 08:00:01"])
        );
        assert_eq!(
            serde_json::to_value(filter("2025-05-20T08:00:00Z").to_domain()).unwrap()[0],
            json!(["write_date", ">=", "2025-05-20 08:00:00"])
        );
    }

    #[test]
    fn timestamps_accept_several_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 5, 20)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap()
            .and_utc();
        assert_eq!(parse_timestamp("2025-05-20T08:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-05-20T10:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-05-20T08:00:00").unwrap(), expected);
        assert!(parse_timestamp("2025-05-20").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn record_mapping_follows_backend_conventions() {
        let row = json!({
            "id": 9,
            "default_code": false,
            "name": "Camisa",
            "standard_price": 9.8,
            "list_price": 12.5,
            "uom_id": [1, "Units"],
            "categ_id": [7, "All / Saleable"],
            "write_date": "2025-05-24 12:15:23",
            "active": false
        });
        let p = Product::from_record(row.as_object().unwrap());
        assert_eq!(p.sku, "");
        assert_eq!(p.uom.as_deref(), Some("Units"));
        assert_eq!(p.category_id, Some(7));
        assert_eq!(p.status, ProductStatus::Inactive);
        assert_eq!(
            serde_json::to_value(&p).unwrap()["updated_at"],
            "2025-05-24T12:15:23Z"
        );
    }
}
