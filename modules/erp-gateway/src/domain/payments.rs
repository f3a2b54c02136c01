use erp_rpc::{Command, Record, RecordClientExt};
use serde_json::json;
use tracing::{info, warn};

use crate::domain::error::DomainError;
use crate::domain::fields::{self, BACKEND_DATE, Models, MoveFields, PaymentFields};
use crate::domain::models::{NewPayment, Payment};
use crate::domain::service::Service;

const PAYMENT_READ: &[&str] = &[
    PaymentFields::PARTNER,
    PaymentFields::AMOUNT,
    PaymentFields::DATE,
    PaymentFields::JOURNAL,
];

impl Service {
    /// Register an inbound payment against an invoice.
    ///
    /// The counterparty always comes from the invoice. Posting the payment is
    /// attempted but not required: some backends post on create.
    ///
    /// # Errors
    /// [`DomainError::NotFound`] when the invoice does not exist,
    /// [`DomainError::Upstream`] when creating or re-reading the payment fails.
    pub async fn create_payment(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        let invoice_id = payment.invoice_id;
        let invoice = self
            .client()
            .find_by_id(Models::MOVE, invoice_id, &[MoveFields::PARTNER])
            .await?
            .ok_or_else(|| DomainError::not_found("invoice", invoice_id))?;
        let partner_id = fields::many2one_id(&invoice, MoveFields::PARTNER);

        let mut values = Record::new();
        values.insert(PaymentFields::PAYMENT_TYPE.to_owned(), json!("inbound"));
        values.insert(
            PaymentFields::PARTNER.to_owned(),
            partner_id.map_or(json!(false), |id| json!(id)),
        );
        values.insert(PaymentFields::AMOUNT.to_owned(), json!(payment.amount));
        values.insert(PaymentFields::JOURNAL.to_owned(), json!(payment.journal_id));
        values.insert(
            PaymentFields::DATE.to_owned(),
            json!(payment.payment_date.format(BACKEND_DATE).to_string()),
        );
        values.insert(
            PaymentFields::INVOICES.to_owned(),
            json!([Command::link(invoice_id)]),
        );

        let id = self.client().create(Models::PAYMENT, values).await?;
        info!(model = Models::PAYMENT, id, invoice_id, "payment created");

        if let Err(e) = self
            .client()
            .invoke(Models::PAYMENT, PaymentFields::POST_ACTION, &[id])
            .await
        {
            warn!(
                model = Models::PAYMENT,
                id,
                error = %e,
                "posting payment failed; leaving it as draft"
            );
        }

        let row = self.reread(Models::PAYMENT, id, PAYMENT_READ).await?;
        Ok(Payment {
            id,
            invoice_id,
            partner_id: fields::many2one_id(&row, PaymentFields::PARTNER),
            amount: fields::number(&row, PaymentFields::AMOUNT).unwrap_or_default(),
            payment_date: fields::text(&row, PaymentFields::DATE),
            journal_id: fields::many2one_id(&row, PaymentFields::JOURNAL),
        })
    }
}
