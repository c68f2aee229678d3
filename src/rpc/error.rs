//! JSON-RPC error taxonomy.
//!
//! [`RequestError`] is both the value a handler returns to reject a request
//! and the literal `error` payload of an error response. The six codes below
//! are fixed for wire compatibility:
//!
//! | Kind             | Code     | Message                   |
//! |------------------|----------|---------------------------|
//! | `ParseError`     | `-32700` | `Parse error`             |
//! | `InvalidRequest` | `-32600` | `Invalid request`         |
//! | `MethodNotFound` | `-32601` | `Method not found`        |
//! | `InvalidParams`  | `-32602` | `Invalid params`          |
//! | `InternalError`  | `-32603` | `Internal error`          |
//! | `AuthRequired`   | `-32000` | `Authentication required` |

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::AppError;

/// Well-known error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// The agent requires authentication before serving the call.
    AuthRequired,
}

impl ErrorCode {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::AuthRequired => -32000,
        }
    }

    /// Default human-readable message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::AuthRequired => "Authentication required",
        }
    }

    /// Map a numeric code back to a known kind.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        [
            Self::ParseError,
            Self::InvalidRequest,
            Self::MethodNotFound,
            Self::InvalidParams,
            Self::InternalError,
            Self::AuthRequired,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }
}

/// A JSON-RPC error: `{ "code", "message", "data"? }`.
///
/// Immutable after construction. `data` holds `{ "details": … }` when built
/// through one of the named constructors with details; errors received from
/// a peer keep whatever `data` payload the peer sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestError {
    code: i64,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RequestError {
    /// Build an error with an arbitrary code. Empty `details` leave `data` unset.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: details
                .filter(|details| !details.is_empty())
                .map(|details| json!({ "details": details })),
        }
    }

    fn of_kind(kind: ErrorCode, details: Option<String>) -> Self {
        Self::new(kind.code(), kind.message(), details)
    }

    /// `-32700 Parse error`.
    #[must_use]
    pub fn parse_error(details: Option<String>) -> Self {
        Self::of_kind(ErrorCode::ParseError, details)
    }

    /// `-32600 Invalid request`.
    #[must_use]
    pub fn invalid_request(details: Option<String>) -> Self {
        Self::of_kind(ErrorCode::InvalidRequest, details)
    }

    /// `-32601 Method not found`.
    #[must_use]
    pub fn method_not_found(details: Option<String>) -> Self {
        Self::of_kind(ErrorCode::MethodNotFound, details)
    }

    /// `-32602 Invalid params`.
    #[must_use]
    pub fn invalid_params(details: Option<String>) -> Self {
        Self::of_kind(ErrorCode::InvalidParams, details)
    }

    /// `-32603 Internal error`.
    #[must_use]
    pub fn internal_error(details: Option<String>) -> Self {
        Self::of_kind(ErrorCode::InternalError, details)
    }

    /// `-32000 Authentication required`.
    #[must_use]
    pub fn auth_required(details: Option<String>) -> Self {
        Self::of_kind(ErrorCode::AuthRequired, details)
    }

    /// Numeric code.
    #[must_use]
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Known kind for this code, if any.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Raw `data` payload.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// The `data.details` string, when present.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        self.data.as_ref()?.get("details")?.as_str()
    }

    /// Response fragment `{ "error": { … } }` ready to merge into a response.
    #[must_use]
    pub fn into_response_payload(self) -> Value {
        json!({ "error": self })
    }
}

impl Display for RequestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)?;
        if let Some(details) = self.details() {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RequestError {}

impl From<AppError> for RequestError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Rpc(inner) => inner,
            AppError::Parse(msg) => Self::parse_error(Some(msg)),
            other => Self::internal_error(Some(other.to_string())),
        }
    }
}
