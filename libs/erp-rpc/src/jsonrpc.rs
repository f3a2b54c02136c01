//! JSON-RPC transport for Odoo-style backends.
//!
//! Every call is an HTTP `POST {url}/jsonrpc` carrying a JSON-RPC 2.0
//! envelope. Logging in goes through the `common` service; record access
//! goes through `object.execute_kw` with the database, uid and password
//! prepended to the model call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::client::{FindOptions, Record, RecordClient, RecordId};
use crate::config::RpcConfig;
use crate::domain::Domain;
use crate::error::{RpcError, RpcResult};

/// Authenticated session: the uid returned by `common.login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub uid: i64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<JsonRpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<JsonRpcErrorBody> for RpcError {
    fn from(body: JsonRpcErrorBody) -> Self {
        let detail = body.data.and_then(|d| match (d.name, d.message) {
            (_, Some(m)) if !m.is_empty() => Some(m),
            (Some(n), _) => Some(n),
            _ => None,
        });
        RpcError::Remote {
            code: body.code,
            message: detail.unwrap_or(body.message),
        }
    }
}

/// [`RecordClient`] over HTTP JSON-RPC.
///
/// The session is created on first use and shared by all callers; the
/// `OnceCell` guarantees a single successful login even when many requests
/// arrive together. A failed login is not cached.
pub struct JsonRpcClient {
    http: reqwest::Client,
    endpoint: String,
    database: String,
    username: String,
    password: SecretString,
    session: OnceCell<Session>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("session", &self.session.get())
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Build a client from configuration. No network traffic happens here.
    ///
    /// # Errors
    /// Returns [`RpcError::Decode`] if the URL is invalid and
    /// [`RpcError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: RpcConfig) -> RpcResult<Self> {
        let base = url::Url::parse(&config.url)
            .map_err(|e| RpcError::decode(format!("invalid backend URL '{}': {e}", config.url)))?;
        let endpoint = base
            .join("jsonrpc")
            .map_err(|e| RpcError::decode(format!("invalid backend URL '{}': {e}", config.url)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            database: config.database,
            username: config.username,
            password: config.password,
            session: OnceCell::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Establish the session now instead of on the first call.
    ///
    /// # Errors
    /// Returns the login failure; a later call will try again.
    pub async fn connect(&self) -> RpcResult<Session> {
        self.session().await
    }

    async fn session(&self) -> RpcResult<Session> {
        self.session
            .get_or_try_init(|| self.login())
            .await
            .copied()
    }

    #[instrument(skip(self), fields(database = %self.database, user = %self.username))]
    async fn login(&self) -> RpcResult<Session> {
        info!("Connecting to backend");
        let result = self
            .call(
                "common",
                "login",
                json!([self.database, self.username, self.password.expose_secret()]),
            )
            .await?;

        match result.as_i64() {
            Some(uid) => {
                info!(uid, "Backend session established");
                Ok(Session { uid })
            }
            None => Err(RpcError::Authentication {
                database: self.database.clone(),
                username: self.username.clone(),
            }),
        }
    }

    async fn call(&self, service: &str, method: &str, args: Value) -> RpcResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": "call",
            "params": { "service": service, "method": method, "args": args },
            "id": id,
        });

        let resp = self.http.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Http {
                status: status.as_u16(),
            });
        }

        let payload: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| RpcError::decode(e.to_string()))?;

        if let Some(err) = payload.error {
            return Err(err.into());
        }
        payload
            .result
            .ok_or_else(|| RpcError::decode("response carries neither result nor error"))
    }

    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Map<String, Value>,
    ) -> RpcResult<Value> {
        let session = self.session().await?;
        debug!(model, method, "execute_kw");
        self.call(
            "object",
            "execute_kw",
            json!([
                self.database,
                session.uid,
                self.password.expose_secret(),
                model,
                method,
                args,
                kwargs
            ]),
        )
        .await
    }
}

#[async_trait]
impl RecordClient for JsonRpcClient {
    async fn create(&self, model: &str, values: Record) -> RpcResult<RecordId> {
        let result = self
            .execute_kw(model, "create", json!([values]), Map::new())
            .await?;
        // Newer backends answer a single create with a one-element id list.
        match &result {
            Value::Number(n) => n.as_i64(),
            Value::Array(ids) => ids.first().and_then(Value::as_i64),
            _ => None,
        }
        .ok_or_else(|| RpcError::decode(format!("create on {model} returned {result}")))
    }

    async fn find(
        &self,
        model: &str,
        domain: &Domain,
        fields: &[&str],
        options: FindOptions,
    ) -> RpcResult<Vec<Record>> {
        let mut kwargs = Map::new();
        kwargs.insert("fields".to_owned(), json!(fields));
        if options.offset > 0 {
            kwargs.insert("offset".to_owned(), json!(options.offset));
        }
        if let Some(limit) = options.limit {
            kwargs.insert("limit".to_owned(), json!(limit));
        }
        if let Some(order) = options.order {
            kwargs.insert("order".to_owned(), json!(order));
        }

        let result = self
            .execute_kw(model, "search_read", json!([domain]), kwargs)
            .await?;
        let Value::Array(rows) = result else {
            return Err(RpcError::decode(format!(
                "search_read on {model} returned a non-list"
            )));
        };
        rows.into_iter()
            .map(|row| match row {
                Value::Object(record) => Ok(record),
                other => Err(RpcError::decode(format!(
                    "search_read on {model} returned row {other}"
                ))),
            })
            .collect()
    }

    async fn update(&self, model: &str, ids: &[RecordId], values: Record) -> RpcResult<bool> {
        let result = self
            .execute_kw(model, "write", json!([ids, values]), Map::new())
            .await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn invoke(&self, model: &str, action: &str, ids: &[RecordId]) -> RpcResult<Value> {
        self.execute_kw(model, action, json!([ids]), Map::new())
            .await
    }
}
