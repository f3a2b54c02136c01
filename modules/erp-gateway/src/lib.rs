//! HTTP gateway in front of an Odoo-style ERP.
//!
//! Resource handlers validate input, translate it into backend record
//! operations through [`erp_rpc::RecordClient`] and map the results back.
//! [`Gateway`] composes them behind bearer authentication and a per-client
//! rate limit.

pub mod api;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod middleware;

pub use config::{GatewayConfig, LogFormat, LoggingConfig, RateLimitConfig, ServerConfig};
pub use domain::error::DomainError;
pub use domain::service::Service;
pub use gateway::{Gateway, in_memory_backend};
