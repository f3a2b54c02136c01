use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::Domain;
use crate::error::RpcResult;

/// Backend record id. Opaque to callers; only compared for equality.
pub type RecordId = i64;

/// One row as returned by the backend, keyed by field name.
pub type Record = Map<String, Value>;

/// Paging and ordering for [`RecordClient::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    /// Backend order clause, e.g. `"write_date desc, id"`.
    pub order: Option<String>,
}

impl FindOptions {
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
}

/// The four primitives the gateway needs from the backend.
///
/// Implementations are shared across all in-flight requests.
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// Create one record and return its id.
    async fn create(&self, model: &str, values: Record) -> RpcResult<RecordId>;

    /// Read the records matching `domain`, restricted to `fields`.
    async fn find(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: FindOptions,
    ) -> RpcResult<Vec<Record>>;

    /// Write `values` onto every record in `ids`.
    async fn update(&self, model: &str, ids: &[RecordId], values: Record) -> RpcResult<bool>;

    /// Call a named model method (e.g. `action_post`) on `ids`.
    async fn invoke(&self, model: &str, action: &str, ids: &[RecordId]) -> RpcResult<Value>;
}

/// Convenience lookups built on [`RecordClient::find`].
#[async_trait]
pub trait RecordClientExt: RecordClient {
    /// Read a single record by id, `None` when it does not exist.
    async fn find_by_id(
        &self,
        model: &str,
        id: RecordId,
        fields: &[&str],
    ) -> RpcResult<Option<Record>> {
        let mut rows = self
            .find(model, &Domain::by_id(id), fields, FindOptions::default().limit(1))
            .await?;
        Ok(rows.pop())
    }
}

impl<T: RecordClient + ?Sized> RecordClientExt for T {}
