use erp_rpc::{Command, Record, RecordClientExt, RecordId};
use serde_json::{Value, json};
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::fields::{self, Models, OrderFields};
use crate::domain::models::{LineItem, NewOrder, Order};
use crate::domain::service::Service;

const ORDER_READ: &[&str] = &[OrderFields::PARTNER, OrderFields::AMOUNT_TOTAL, OrderFields::LINES];

/// `[0, 0, values]` create commands for order or invoice lines.
pub(crate) fn line_commands(lines: &[LineItem], quantity_field: &str) -> Value {
    Value::Array(
        lines
            .iter()
            .map(|line| {
                let mut values = Record::new();
                values.insert(OrderFields::LINE_PRODUCT.to_owned(), json!(line.product_id));
                values.insert(quantity_field.to_owned(), json!(line.quantity));
                values.insert(OrderFields::LINE_PRICE.to_owned(), json!(line.price_unit));
                Command::create(values)
            })
            .collect(),
    )
}

impl Service {
    /// # Errors
    /// [`DomainError::Upstream`] if the backend fails or the order cannot be read back.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut values = Record::new();
        values.insert(OrderFields::PARTNER.to_owned(), json!(order.partner_id));
        values.insert(
            OrderFields::LINES.to_owned(),
            line_commands(&order.lines, OrderFields::LINE_QUANTITY),
        );

        let id = self.client().create(Models::SALE_ORDER, values).await?;
        info!(model = Models::SALE_ORDER, id, lines = order.lines.len(), "order created");

        let row = self.reread(Models::SALE_ORDER, id, ORDER_READ).await?;
        self.to_order(id, &row).await
    }

    /// # Errors
    /// [`DomainError::NotFound`] when no order has this id.
    pub async fn get_order(&self, id: RecordId) -> Result<Order, DomainError> {
        let row = self
            .client()
            .find_by_id(Models::SALE_ORDER, id, ORDER_READ)
            .await?
            .ok_or_else(|| DomainError::not_found("order", id))?;
        self.to_order(id, &row).await
    }

    async fn to_order(&self, id: RecordId, row: &Record) -> Result<Order, DomainError> {
        let line_ids = fields::ids(row, OrderFields::LINES);
        let order_lines = self
            .read_lines(Models::SALE_ORDER_LINE, &line_ids, OrderFields::LINE_QUANTITY)
            .await?;

        Ok(Order {
            id,
            partner_id: fields::many2one_id(row, OrderFields::PARTNER),
            amount_total: fields::number(row, OrderFields::AMOUNT_TOTAL).unwrap_or_default(),
            order_lines,
        })
    }
}
