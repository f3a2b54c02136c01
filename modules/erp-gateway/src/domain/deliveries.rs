use erp_rpc::{Record, RecordClientExt};
use serde_json::json;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::fields::{self, Models, OrderFields};
use crate::domain::models::{Delivery, DeliveryUpdate};
use crate::domain::service::Service;

const DELIVERED_STATE: &str = "done";

impl Service {
    /// Mark an existing order as delivered under a tracking number.
    ///
    /// # Errors
    /// [`DomainError::NotFound`] when the order does not exist,
    /// [`DomainError::Upstream`] when the write or the re-read fails.
    pub async fn record_delivery(&self, update: DeliveryUpdate) -> Result<Delivery, DomainError> {
        let order_id = update.order_id;
        self.client()
            .find_by_id(Models::SALE_ORDER, order_id, &[OrderFields::STATE])
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))?;

        let mut values = Record::new();
        values.insert(OrderFields::TRACKING_REF.to_owned(), json!(update.tracking_number));
        values.insert(OrderFields::STATE.to_owned(), json!(DELIVERED_STATE));
        self.client()
            .update(Models::SALE_ORDER, &[order_id], values)
            .await?;
        info!(
            model = Models::SALE_ORDER,
            id = order_id,
            carrier = update.carrier.as_deref().unwrap_or("unknown"),
            "delivery recorded"
        );

        let row = self
            .reread(
                Models::SALE_ORDER,
                order_id,
                &[OrderFields::TRACKING_REF, OrderFields::STATE],
            )
            .await?;

        Ok(Delivery {
            order_id,
            tracking_number: fields::text(&row, OrderFields::TRACKING_REF).unwrap_or_default(),
            status: fields::text(&row, OrderFields::STATE).unwrap_or_default(),
        })
    }
}
