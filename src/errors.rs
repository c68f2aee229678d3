//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

use crate::rpc::error::RequestError;

/// Shared crate result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Crate error enumeration covering all transport failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Read or write failure on the underlying byte stream.
    Io(String),
    /// An inbound line was not valid JSON. Fatal to the read loop.
    Parse(String),
    /// Valid JSON that is not a usable message or result, or an inbound
    /// line over the configured cap.
    Protocol(String),
    /// The connection closed before the operation could complete.
    ConnectionClosed(String),
    /// A request did not receive its response within the configured window.
    Timeout(String),
    /// The peer answered a request with an error response.
    Rpc(RequestError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::ConnectionClosed(msg) => write!(f, "connection closed: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Rpc(err) => write!(f, "rpc: {err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<RequestError> for AppError {
    fn from(err: RequestError) -> Self {
        Self::Rpc(err)
    }
}
