use std::sync::Arc;

use erp_rpc::{Domain, FindOptions, Record, RecordClient, RecordClientExt, RecordId};

use crate::domain::error::DomainError;
use crate::domain::fields::{self, OrderFields};
use crate::domain::models::LineItem;

/// Resource operations over a shared [`RecordClient`].
///
/// Calls within one operation are strictly sequential; nothing is cached
/// between requests.
#[derive(Clone)]
pub struct Service {
    client: Arc<dyn RecordClient>,
}

impl Service {
    #[must_use]
    pub fn new(client: Arc<dyn RecordClient>) -> Self {
        Self { client }
    }

    pub(crate) fn client(&self) -> &dyn RecordClient {
        self.client.as_ref()
    }

    /// Read a record that was just written; its absence is an upstream failure.
    pub(crate) async fn reread(
        &self,
        model: &str,
        id: RecordId,
        fields: &[&str],
    ) -> Result<Record, DomainError> {
        self.client
            .find_by_id(model, id, fields)
            .await?
            .ok_or_else(|| DomainError::missing_after_write(model, id))
    }

    /// Read line records by id, keeping the backend's order.
    pub(crate) async fn read_lines(
        &self,
        model: &str,
        ids: &[RecordId],
        quantity_field: &str,
    ) -> Result<Vec<LineItem>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .client
            .find(
                model,
                &Domain::by_ids(ids),
                &[OrderFields::LINE_PRODUCT, quantity_field, OrderFields::LINE_PRICE],
                FindOptions::default(),
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| LineItem {
                product_id: fields::many2one_id(row, OrderFields::LINE_PRODUCT).unwrap_or_default(),
                quantity: fields::number(row, quantity_field).unwrap_or_default(),
                price_unit: fields::number(row, OrderFields::LINE_PRICE).unwrap_or_default(),
            })
            .collect())
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service").finish_non_exhaustive()
    }
}
