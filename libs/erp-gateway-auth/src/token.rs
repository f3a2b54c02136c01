//! Issuing and verifying bearer tokens for the configured principal.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::config::{AuthConfig, AuthConfigError};
use crate::errors::AuthError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

/// A freshly signed token and its lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Signs and checks HMAC JWTs; holds the one principal allowed to log in.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    lifetime_secs: u64,
    username: String,
    password: SecretString,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.header.alg)
            .field("lifetime_secs", &self.lifetime_secs)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// # Errors
    /// Returns [`AuthConfigError`] when the configuration cannot sign tokens.
    pub fn new(config: AuthConfig) -> Result<Self, AuthConfigError> {
        config.validate()?;

        let secret = config.jwt_secret.expose_secret().as_bytes();
        let mut validation = Validation::new(config.jwt_algorithm);
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            header: Header::new(config.jwt_algorithm),
            validation,
            lifetime_secs: config.expire_minutes.saturating_mul(60),
            username: config.principal.username,
            password: config.principal.password,
        })
    }

    /// Check a username/password pair against the configured principal.
    ///
    /// An empty configured password rejects every attempt.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] on any mismatch.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let expected = self.password.expose_secret();
        let user_ok = username.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(expected.as_bytes());

        if expected.is_empty() || !bool::from(user_ok & pass_ok) {
            warn!(username, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(())
    }

    /// Sign a token for `subject` valid from now.
    ///
    /// # Errors
    /// [`AuthError::Signing`] if the token cannot be encoded.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject, get_current_timestamp())
    }

    pub(crate) fn issue_at(&self, subject: &str, now: u64) -> Result<IssuedToken, AuthError> {
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now,
            exp: now.saturating_add(self.lifetime_secs),
        };
        let token = encode(&self.header, &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        info!(subject, "token issued");
        Ok(IssuedToken {
            token,
            expires_in: self.lifetime_secs,
        })
    }

    /// Check signature and expiry and return the subject.
    ///
    /// # Errors
    /// [`AuthError::TokenExpired`] past `exp` plus leeway,
    /// [`AuthError::InvalidToken`] for anything else wrong with the token.
    pub fn verify(&self, token: &str) -> Result<String, AuthError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) => {
                debug!(error = %e, "token rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                    _ => Err(AuthError::InvalidToken),
                }
            }
        }
    }
}
