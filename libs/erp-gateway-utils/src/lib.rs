#![forbid(unsafe_code)]

pub mod secret_serde;
