use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token signing and the single accepted principal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// HMAC signing secret; must not be empty.
    #[serde(skip_serializing, deserialize_with = "erp_gateway_utils::secret_serde::deserialize")]
    pub jwt_secret: SecretString,

    /// One of HS256, HS384, HS512.
    pub jwt_algorithm: Algorithm,

    /// Token lifetime in minutes.
    pub expire_minutes: u64,

    /// Clock skew tolerated when checking `exp`.
    pub leeway_seconds: u64,

    pub principal: PrincipalConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::from(String::new()),
            jwt_algorithm: Algorithm::HS256,
            expire_minutes: 1440,
            leeway_seconds: 0,
            principal: PrincipalConfig::default(),
        }
    }
}

/// The service account allowed to obtain tokens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrincipalConfig {
    pub username: String,
    #[serde(skip_serializing, deserialize_with = "erp_gateway_utils::secret_serde::deserialize")]
    pub password: SecretString,
}

impl Default for PrincipalConfig {
    fn default() -> Self {
        Self {
            username: "sbo".to_owned(),
            password: SecretString::from(String::new()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthConfigError {
    #[error("jwt_secret must not be empty")]
    EmptySecret,

    #[error("unsupported jwt_algorithm {0:?}: only HS256, HS384 and HS512 are accepted")]
    UnsupportedAlgorithm(Algorithm),

    #[error("expire_minutes must be greater than zero")]
    ZeroLifetime,
}

impl AuthConfig {
    /// Check the settings a [`crate::TokenService`] needs.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), AuthConfigError> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(AuthConfigError::EmptySecret);
        }
        if !matches!(
            self.jwt_algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthConfigError::UnsupportedAlgorithm(self.jwt_algorithm));
        }
        if self.expire_minutes == 0 {
            return Err(AuthConfigError::ZeroLifetime);
        }
        Ok(())
    }
}
