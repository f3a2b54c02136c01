use chrono::NaiveDate;
use erp_rpc::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    #[default]
    Person,
    Company,
}

impl CompanyType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Company => "company",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company_type: CompanyType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Customer {
    pub id: RecordId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_type: String,
}

/// A product line on an order or invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub product_id: RecordId,
    pub quantity: f64,
    pub price_unit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub partner_id: RecordId,
    pub lines: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: RecordId,
    pub partner_id: Option<RecordId>,
    pub amount_total: f64,
    pub order_lines: Vec<LineItem>,
}

/// Direction of an invoice, chosen by the endpoint the caller used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceKind {
    Customer,
    Supplier,
}

impl InvoiceKind {
    #[must_use]
    pub fn move_type(self) -> &'static str {
        match self {
            Self::Customer => "out_invoice",
            Self::Supplier => "in_invoice",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub kind: InvoiceKind,
    pub partner_id: RecordId,
    pub lines: Vec<LineItem>,
    pub invoice_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: RecordId,
    pub partner_id: Option<RecordId>,
    pub move_type: String,
    pub amount_total: f64,
    pub invoice_date: Option<String>,
    pub invoice_lines: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryUpdate {
    pub order_id: RecordId,
    pub tracking_number: String,
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub order_id: RecordId,
    pub tracking_number: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub invoice_id: RecordId,
    pub amount: f64,
    pub payment_date: NaiveDate,
    pub journal_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub id: RecordId,
    pub invoice_id: RecordId,
    pub partner_id: Option<RecordId>,
    pub amount: f64,
    pub payment_date: Option<String>,
    pub journal_id: Option<RecordId>,
}
