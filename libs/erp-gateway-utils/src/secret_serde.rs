//! Lenient deserialization of secrets from configuration.
//!
//! Environment providers type their values, so `ODOO_PASSWORD=1234` arrives
//! as a number and `true` as a boolean. Both are kept in their textual form.
//!
//! ```
//! use secrecy::SecretString;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Backend {
//!     #[serde(deserialize_with = "erp_gateway_utils::secret_serde::deserialize")]
//!     password: SecretString,
//! }
//! ```

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

/// Deserialize any scalar into a [`SecretString`].
///
/// # Errors
/// Returns the deserializer's error if the value is not a scalar.
pub fn deserialize<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Integer(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    };
    Ok(SecretString::from(text))
}
