//! Backend model names, field names and readers for the backend's value
//! conventions (`false` for unset, `[id, name]` for many2one).

use erp_rpc::{Record, RecordId};
use serde_json::Value;

pub struct Models;

impl Models {
    pub const PARTNER: &'static str = "res.partner";
    pub const SALE_ORDER: &'static str = "sale.order";
    pub const SALE_ORDER_LINE: &'static str = "sale.order.line";
    pub const MOVE: &'static str = "account.move";
    pub const MOVE_LINE: &'static str = "account.move.line";
    pub const PAYMENT: &'static str = "account.payment";
    pub const PRODUCT: &'static str = "product.product";
}

pub struct PartnerFields;

impl PartnerFields {
    pub const NAME: &'static str = "name";
    pub const EMAIL: &'static str = "email";
    pub const PHONE: &'static str = "phone";
    pub const COMPANY_TYPE: &'static str = "company_type";
    pub const READ: &'static [&'static str] =
        &[Self::NAME, Self::EMAIL, Self::PHONE, Self::COMPANY_TYPE];
}

pub struct OrderFields;

impl OrderFields {
    pub const PARTNER: &'static str = "partner_id";
    pub const AMOUNT_TOTAL: &'static str = "amount_total";
    pub const LINES: &'static str = "order_line";
    pub const TRACKING_REF: &'static str = "carrier_tracking_ref";
    pub const STATE: &'static str = "state";
    pub const LINE_PRODUCT: &'static str = "product_id";
    pub const LINE_QUANTITY: &'static str = "product_uom_qty";
    pub const LINE_PRICE: &'static str = "price_unit";
}

pub struct MoveFields;

impl MoveFields {
    pub const MOVE_TYPE: &'static str = "move_type";
    pub const PARTNER: &'static str = "partner_id";
    pub const AMOUNT_TOTAL: &'static str = "amount_total";
    pub const INVOICE_DATE: &'static str = "invoice_date";
    pub const LINES: &'static str = "invoice_line_ids";
    pub const LINE_PRODUCT: &'static str = "product_id";
    pub const LINE_QUANTITY: &'static str = "quantity";
    pub const LINE_PRICE: &'static str = "price_unit";
}

pub struct PaymentFields;

impl PaymentFields {
    pub const PAYMENT_TYPE: &'static str = "payment_type";
    pub const PARTNER: &'static str = "partner_id";
    pub const AMOUNT: &'static str = "amount";
    pub const JOURNAL: &'static str = "journal_id";
    pub const DATE: &'static str = "payment_date";
    pub const INVOICES: &'static str = "invoice_ids";
    pub const POST_ACTION: &'static str = "action_post";
}

pub struct ProductFields;

impl ProductFields {
    pub const CODE: &'static str = "default_code";
    pub const NAME: &'static str = "name";
    pub const STANDARD_PRICE: &'static str = "standard_price";
    pub const LIST_PRICE: &'static str = "list_price";
    pub const UOM: &'static str = "uom_id";
    pub const CATEGORY: &'static str = "categ_id";
    pub const WRITE_DATE: &'static str = "write_date";
    pub const ACTIVE: &'static str = "active";
    pub const READ: &'static [&'static str] = &[
        Self::CODE,
        Self::NAME,
        Self::STANDARD_PRICE,
        Self::LIST_PRICE,
        Self::UOM,
        Self::CATEGORY,
        Self::WRITE_DATE,
        Self::ACTIVE,
    ];
}

/// Backend datetime format, always UTC.
pub const BACKEND_DATETIME: &str = "%Y-%m-%d %H:%M:%S";
pub const BACKEND_DATE: &str = "%Y-%m-%d";

pub fn record_id(record: &Record) -> Option<RecordId> {
    record.get("id").and_then(Value::as_i64)
}

/// A string field, `None` when unset.
pub fn text(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// A numeric field, `None` when unset.
pub fn number(record: &Record, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}

/// Id of a many2one field, accepting both `[id, name]` and a bare id.
pub fn many2one_id(record: &Record, field: &str) -> Option<RecordId> {
    match record.get(field)? {
        Value::Array(pair) => pair.first().and_then(Value::as_i64),
        other => other.as_i64(),
    }
}

/// Display name of a many2one field.
pub fn many2one_name(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::Array(pair) => pair.get(1).and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

/// Ids of an x2many field.
pub fn ids(record: &Record, field: &str) -> Vec<RecordId> {
    match record.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_i64).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn unset_fields_read_as_none() {
        let r = record(json!({"phone": false, "uom_id": false, "order_line": false}));
        assert_eq!(text(&r, "phone"), None);
        assert_eq!(many2one_id(&r, "uom_id"), None);
        assert_eq!(many2one_name(&r, "uom_id"), None);
        assert!(ids(&r, "order_line").is_empty());
        assert_eq!(number(&r, "missing"), None);
    }

    #[test]
    fn many2one_reads_both_shapes() {
        let r = record(json!({"partner_id": [12, "Ana"], "categ_id": 7}));
        assert_eq!(many2one_id(&r, "partner_id"), Some(12));
        assert_eq!(many2one_name(&r, "partner_id").as_deref(), Some("Ana"));
        assert_eq!(many2one_id(&r, "categ_id"), Some(7));
    }
}
