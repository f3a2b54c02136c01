use erp_rpc::{Domain, FindOptions, Record, RecordClientExt, RecordId};
use serde_json::json;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::fields::{self, Models, PartnerFields};
use crate::domain::models::{Customer, NewCustomer};
use crate::domain::service::Service;

fn to_customer(id: RecordId, row: &Record) -> Customer {
    Customer {
        id,
        name: fields::text(row, PartnerFields::NAME).unwrap_or_default(),
        email: fields::text(row, PartnerFields::EMAIL),
        phone: fields::text(row, PartnerFields::PHONE),
        company_type: fields::text(row, PartnerFields::COMPANY_TYPE)
            .unwrap_or_else(|| "person".to_owned()),
    }
}

impl Service {
    /// # Errors
    /// [`DomainError::Upstream`] if the backend fails or the new record cannot be read back.
    pub async fn create_customer(&self, customer: NewCustomer) -> Result<Customer, DomainError> {
        let mut values = Record::new();
        values.insert(PartnerFields::NAME.to_owned(), json!(customer.name));
        values.insert(PartnerFields::EMAIL.to_owned(), json!(customer.email));
        values.insert(
            PartnerFields::PHONE.to_owned(),
            customer.phone.map_or(json!(false), |p| json!(p)),
        );
        values.insert(
            PartnerFields::COMPANY_TYPE.to_owned(),
            json!(customer.company_type.as_str()),
        );

        let id = self.client().create(Models::PARTNER, values).await?;
        info!(model = Models::PARTNER, id, "customer created");

        let row = self.reread(Models::PARTNER, id, PartnerFields::READ).await?;
        Ok(to_customer(id, &row))
    }

    /// # Errors
    /// [`DomainError::NotFound`] when no partner has this id.
    pub async fn get_customer(&self, id: RecordId) -> Result<Customer, DomainError> {
        let row = self
            .client()
            .find_by_id(Models::PARTNER, id, PartnerFields::READ)
            .await?
            .ok_or_else(|| DomainError::not_found("customer", id))?;
        Ok(to_customer(id, &row))
    }

    /// Customers ordered by id.
    ///
    /// # Errors
    /// [`DomainError::Upstream`] if the backend fails.
    pub async fn list_customers(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Customer>, DomainError> {
        let rows = self
            .client()
            .find(
                Models::PARTNER,
                &Domain::all(),
                PartnerFields::READ,
                FindOptions::default().limit(limit).offset(offset).order("id"),
            )
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| fields::record_id(row).map(|id| to_customer(id, row)))
            .collect())
    }
}
