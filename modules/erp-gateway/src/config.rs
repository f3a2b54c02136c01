//! Gateway configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. Flat legacy variables (`ODOO_URL`, `JWT_SECRET`, `PORT`, ...)
//! 3. `GATEWAY__SECTION__KEY` variables, `__` separating nested sections

use anyhow::{Context, Result, bail};
use erp_gateway_auth::AuthConfig;
use erp_rpc::RpcConfig;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

/// Legacy variable name and the config path it feeds.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("ODOO_URL", "backend.url"),
    ("ODOO_DB", "backend.database"),
    ("ODOO_USERNAME", "backend.username"),
    ("ODOO_PASSWORD", "backend.password"),
    ("PORT", "server.port"),
    ("JWT_SECRET", "auth.jwt_secret"),
    ("JWT_ALGORITHM", "auth.jwt_algorithm"),
    ("JWT_EXPIRE_MINUTES", "auth.expire_minutes"),
    ("SBO_USER", "auth.principal.username"),
    ("SBO_PASSWORD", "auth.principal.password"),
    ("LOG_LEVEL", "logging.level"),
];

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub backend: RpcConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Prefix for every route, e.g. `/api`. Empty serves from the root.
    pub base_path: String,
    pub request_timeout_ms: u64,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_owned(),
            port: 1987,
            base_path: String::new(),
            request_timeout_ms: 30_000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Per-client-address request ceiling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests admitted per window.
    pub requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 10,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    /// Provider chain; public so callers can layer more on top.
    #[must_use]
    pub fn figment() -> Figment {
        let legacy_names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Env::raw().only(&legacy_names).map(|key| {
                LEGACY_ENV
                    .iter()
                    .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                    .map_or_else(|| key.as_str().to_owned(), |(_, path)| (*path).to_owned())
                    .into()
            }))
            .merge(Env::prefixed("GATEWAY__").split("__"))
    }

    /// Load from the environment and validate.
    ///
    /// # Errors
    /// Returns an error if a value cannot be parsed or fails validation.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment()
            .extract()
            .context("failed to read gateway configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.auth.validate().context("invalid auth configuration")?;

        if self.rate_limit.requests == 0 {
            bail!("rate_limit.requests must be greater than zero");
        }
        if self.rate_limit.window_secs == 0 {
            bail!("rate_limit.window_secs must be greater than zero");
        }

        let base = &self.server.base_path;
        if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
            bail!("server.base_path must start with '/' and not end with '/', got '{base}'");
        }
        if self.backend.url.trim().is_empty() {
            bail!("backend.url must not be empty");
        }
        Ok(())
    }
}
