//! Record-level access to an Odoo-style ERP over JSON-RPC.
//!
//! [`RecordClient`] is the seam: the gateway talks to it, [`JsonRpcClient`]
//! speaks the wire protocol, and [`InMemoryRecordClient`] stands in for the
//! backend in tests.

pub mod client;
pub mod command;
pub mod config;
pub mod domain;
pub mod error;
pub mod jsonrpc;
pub mod memory;

pub use client::{FindOptions, Record, RecordClient, RecordClientExt, RecordId};
pub use command::Command;
pub use config::{BackendKind, RpcConfig};
pub use domain::{Condition, Domain, Operator, Term, escape_like};
pub use error::{RpcError, RpcResult};
pub use jsonrpc::{JsonRpcClient, Session};
pub use memory::{InMemoryRecordClient, Invocation};
