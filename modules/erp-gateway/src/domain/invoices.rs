use erp_rpc::Record;
use serde_json::json;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::fields::{self, BACKEND_DATE, Models, MoveFields};
use crate::domain::models::{Invoice, NewInvoice};
use crate::domain::orders::line_commands;
use crate::domain::service::Service;

const INVOICE_READ: &[&str] = &[
    MoveFields::MOVE_TYPE,
    MoveFields::PARTNER,
    MoveFields::AMOUNT_TOTAL,
    MoveFields::INVOICE_DATE,
    MoveFields::LINES,
];

impl Service {
    /// Create a customer or supplier invoice with its lines.
    ///
    /// # Errors
    /// [`DomainError::Upstream`] if the backend fails or the invoice cannot be read back.
    pub async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice, DomainError> {
        let move_type = invoice.kind.move_type();

        let mut values = Record::new();
        values.insert(MoveFields::MOVE_TYPE.to_owned(), json!(move_type));
        values.insert(MoveFields::PARTNER.to_owned(), json!(invoice.partner_id));
        values.insert(
            MoveFields::INVOICE_DATE.to_owned(),
            invoice
                .invoice_date
                .map_or(json!(false), |d| json!(d.format(BACKEND_DATE).to_string())),
        );
        values.insert(
            MoveFields::LINES.to_owned(),
            line_commands(&invoice.lines, MoveFields::LINE_QUANTITY),
        );

        let id = self.client().create(Models::MOVE, values).await?;
        info!(model = Models::MOVE, id, move_type, "invoice created");

        let row = self.reread(Models::MOVE, id, INVOICE_READ).await?;
        let line_ids = fields::ids(&row, MoveFields::LINES);
        let invoice_lines = self
            .read_lines(Models::MOVE_LINE, &line_ids, MoveFields::LINE_QUANTITY)
            .await?;

        Ok(Invoice {
            id,
            partner_id: fields::many2one_id(&row, MoveFields::PARTNER),
            move_type: fields::text(&row, MoveFields::MOVE_TYPE)
                .unwrap_or_else(|| move_type.to_owned()),
            amount_total: fields::number(&row, MoveFields::AMOUNT_TOTAL).unwrap_or_default(),
            invoice_date: fields::text(&row, MoveFields::INVOICE_DATE),
            invoice_lines,
        })
    }
}
