//! JSON-RPC 2.0 message shapes.
//!
//! Inbound lines are parsed into a [`serde_json::Value`] first and then
//! classified by field presence, mirroring how the wire format discriminates
//! the three shapes:
//!
//! | `method` | `id` | Shape          |
//! |----------|------|----------------|
//! | yes      | yes  | Request        |
//! | yes      | no   | Notification   |
//! | no       | yes  | Response       |
//! | no       | no   | *(dropped)*    |

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rpc::error::RequestError;
use crate::{AppError, Result};

/// Protocol version tag carried by every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier (the form this crate allocates).
    Number(i64),
    /// String identifier.
    Str(String),
}

impl RequestId {
    /// Interpret a raw `id` value, if it has one of the two valid forms.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Number),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

// ── Outbound frames ───────────────────────────────────────────────────────────

/// Outbound request frame.
#[derive(Debug, Serialize)]
pub struct OutgoingRequest<'a> {
    jsonrpc: &'static str,
    id: &'a RequestId,
    method: &'a str,
    #[serde(skip_serializing_if = "is_null")]
    params: &'a Value,
}

impl<'a> OutgoingRequest<'a> {
    /// Build a request frame.
    #[must_use]
    pub fn new(id: &'a RequestId, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// Outbound notification frame.
#[derive(Debug, Serialize)]
pub struct OutgoingNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "is_null")]
    params: &'a Value,
}

impl<'a> OutgoingNotification<'a> {
    /// Build a notification frame.
    #[must_use]
    pub fn new(method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        }
    }
}

/// Outbound response frame. `id` echoes the request's raw id verbatim.
#[derive(Debug, Serialize)]
pub struct OutgoingResponse<'a> {
    jsonrpc: &'static str,
    id: &'a Value,
    #[serde(flatten)]
    outcome: ResponseOutcome<'a>,
}

#[derive(Debug, Serialize)]
enum ResponseOutcome<'a> {
    #[serde(rename = "result")]
    Result(&'a Value),
    #[serde(rename = "error")]
    Error(&'a RequestError),
}

impl<'a> OutgoingResponse<'a> {
    /// Build a response frame from a handler outcome.
    #[must_use]
    pub fn new(id: &'a Value, outcome: &'a std::result::Result<Value, RequestError>) -> Self {
        let outcome = match outcome {
            Ok(result) => ResponseOutcome::Result(result),
            Err(err) => ResponseOutcome::Error(err),
        };
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            outcome,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_null(value: &&Value) -> bool {
    value.is_null()
}

// ── Inbound classification ────────────────────────────────────────────────────

/// One classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// A call expecting a response. `id` is kept raw so it can be echoed.
    Request {
        /// Raw request id.
        id: Value,
        /// Method name.
        method: String,
        /// Parameters (`null` when absent).
        params: Value,
    },
    /// A fire-and-forget call.
    Notification {
        /// Method name.
        method: String,
        /// Parameters (`null` when absent).
        params: Value,
    },
    /// The answer to a request this side sent.
    Response {
        /// Raw response id.
        id: Value,
        /// `result` on success, the carried error otherwise.
        outcome: std::result::Result<Value, RequestError>,
    },
}

impl IncomingMessage {
    /// Classify a parsed JSON value by field presence.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] if `value` is not an object, has a
    /// non-string `method`, or has neither `method` nor `id`.
    pub fn classify(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(AppError::Protocol("message is not a json object".into()));
        };

        let id = obj.remove("id");
        let params = obj.remove("params").unwrap_or(Value::Null);

        match (obj.remove("method"), id) {
            (Some(Value::String(method)), Some(id)) => Ok(Self::Request { id, method, params }),
            (Some(Value::String(method)), None) => Ok(Self::Notification { method, params }),
            (Some(other), _) => Err(AppError::Protocol(format!(
                "method must be a string, got {other}"
            ))),
            (None, Some(id)) => Ok(Self::Response {
                id,
                outcome: response_outcome(&mut obj),
            }),
            (None, None) => Err(AppError::Protocol(
                "message has neither `method` nor `id`".into(),
            )),
        }
    }

    /// Parse and classify one frame.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Parse`] if `line` is not valid JSON, otherwise the
    /// errors of [`IncomingMessage::classify`].
    pub fn parse_line(line: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| AppError::Parse(format!("malformed json: {e}")))?;
        Self::classify(value)
    }
}

/// A present `result` wins; a missing or `null` `error` resolves to `null`.
fn response_outcome(obj: &mut Map<String, Value>) -> std::result::Result<Value, RequestError> {
    if let Some(result) = obj.remove("result") {
        return Ok(result);
    }
    match obj.remove("error") {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(raw) => Err(serde_json::from_value::<RequestError>(raw.clone())
            .unwrap_or_else(|_| RequestError::internal_error(Some(raw.to_string())))),
    }
}
