//! Newline-delimited JSON-RPC 2.0 transport.
//!
//! - `codec`: newline framing over [`AnyDelimiterCodec`](tokio_util::codec::AnyDelimiterCodec).
//! - `error`: the wire error taxonomy ([`RequestError`]).
//! - `message`: request / notification / response shapes and classification.
//! - `writer`: the serialized outbound [`WriteQueue`](writer::WriteQueue).
//! - `reader`: the inbound frame read loop.
//! - `connection`: request/response correlation and dispatch ([`Connection`]).

pub mod codec;
pub mod connection;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use connection::{Connection, HandlerFuture, HandlerResult, MessageHandler};
pub use error::{ErrorCode, RequestError};
pub use message::RequestId;
