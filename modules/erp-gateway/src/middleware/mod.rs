pub mod rate_limit;

pub use rate_limit::{ClientRateLimiter, client_ip, limit_by_client_ip};
