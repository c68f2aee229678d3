#![forbid(unsafe_code)]

//! `acp-wire` — bidirectional Agent Client Protocol transport.
//!
//! Two peers (an agent and a client) exchange JSON-RPC 2.0 requests,
//! notifications and responses as newline-delimited JSON over any
//! [`AsyncRead`](tokio::io::AsyncRead) / [`AsyncWrite`](tokio::io::AsyncWrite)
//! pair. [`rpc`] is the generic transport; [`acp`] layers the typed
//! agent / client method tables on top.

pub mod acp;
pub mod config;
pub mod errors;
pub mod rpc;

pub use config::TransportConfig;
pub use errors::{AppError, Result};
pub use rpc::{Connection, RequestError};
