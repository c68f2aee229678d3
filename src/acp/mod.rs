//! Agent Client Protocol (ACP) typed layer.
//!
//! Builds role-specific dispatch on top of the generic
//! [`Connection`](crate::rpc::Connection):
//!
//! - `schema`: method names and parameter / result types.
//! - `table`: method-name → validated typed route tables.
//! - `agent`: the [`Agent`] capability set and [`AgentSideConnection`].
//! - `client`: the [`Client`] capability set and [`ClientSideConnection`].
//!
//! Each side's connection implements the *other* side's trait, so agent code
//! calls `conn.read_text_file(..)` exactly as if the client were local.

pub mod agent;
pub mod client;
pub mod schema;
pub mod table;

use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::rpc::connection::Connection;
use crate::rpc::error::RequestError;
use crate::{AppError, Result};

pub use agent::{Agent, AgentSideConnection};
pub use client::{Client, ClientSideConnection};

/// Boxed future returned by [`Agent`] and [`Client`] methods.
pub type AcpFuture<'a, T> = Pin<Box<dyn Future<Output = std::result::Result<T, RequestError>> + Send + 'a>>;

/// Send a typed request and decode its typed result.
async fn call<P, T>(conn: &Connection, method: &str, params: &P) -> Result<T>
where
    P: Serialize + Sync,
    T: DeserializeOwned,
{
    let result = conn.send_request(method, to_params(method, params)?).await?;
    serde_json::from_value(result)
        .map_err(|e| AppError::Protocol(format!("unexpected result for `{method}`: {e}")))
}

/// Send a typed request whose result carries no data.
async fn call_unit<P>(conn: &Connection, method: &str, params: &P) -> Result<()>
where
    P: Serialize + Sync,
{
    conn.send_request(method, to_params(method, params)?)
        .await
        .map(drop)
}

/// Send a typed notification.
fn notify<P: Serialize>(conn: &Connection, method: &str, params: &P) -> Result<()> {
    conn.send_notification(method, &to_params(method, params)?)
}

fn to_params<P: Serialize + ?Sized>(method: &str, params: &P) -> Result<serde_json::Value> {
    serde_json::to_value(params)
        .map_err(|e| AppError::Protocol(format!("failed to serialise `{method}` params: {e}")))
}
