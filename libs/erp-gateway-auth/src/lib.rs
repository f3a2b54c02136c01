//! Bearer tokens for the ERP gateway.
//!
//! A single configured principal trades its credentials for a signed,
//! time-bounded JWT at the token endpoint; [`require_bearer`] guards every
//! other resource route with it.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod token;

pub use config::{AuthConfig, AuthConfigError, PrincipalConfig};
pub use errors::AuthError;
pub use middleware::{Principal, require_bearer};
pub use token::{IssuedToken, TokenService};
