//! Connection settings for the JSON-RPC backend.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Which [`crate::RecordClient`] serves the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// A remote ERP over JSON-RPC.
    #[default]
    JsonRpc,
    /// [`crate::InMemoryRecordClient`]; data lives as long as the process.
    Memory,
}

/// Backend connection configuration.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpcConfig {
    pub kind: BackendKind,
    /// Base URL of the backend, e.g. `http://localhost:8069`.
    pub url: String,
    /// Database name passed on login and on every call.
    pub database: String,
    pub username: String,
    #[serde(skip_serializing, deserialize_with = "erp_gateway_utils::secret_serde::deserialize")]
    pub password: SecretString,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::JsonRpc,
            url: "http://localhost:8069".to_owned(),
            database: String::new(),
            username: String::new(),
            password: SecretString::from(String::new()),
            timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn numeric_password_is_kept_as_text() {
        let config: RpcConfig = serde_json::from_value(serde_json::json!({
            "database": "erp",
            "password": 1234
        }))
        .unwrap();
        assert_eq!(config.password.expose_secret(), "1234");
        assert_eq!(config.url, "http://localhost:8069");
        assert_eq!(config.kind, BackendKind::JsonRpc);
    }

    #[test]
    fn kind_is_read_by_name() {
        let config: RpcConfig =
            serde_json::from_value(serde_json::json!({ "kind": "memory" })).unwrap();
        assert_eq!(config.kind, BackendKind::Memory);
    }
}
