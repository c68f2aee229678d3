//! Unit tests for message classification and outbound frame shapes.

use serde_json::{json, Value};

use acp_wire::rpc::message::{
    IncomingMessage, OutgoingNotification, OutgoingRequest, OutgoingResponse, RequestId,
};
use acp_wire::rpc::RequestError;
use acp_wire::AppError;

#[test]
fn method_and_id_classify_as_request() {
    let msg = IncomingMessage::parse_line(
        r#"{"jsonrpc":"2.0","id":4,"method":"session/new","params":{"cwd":"/tmp"}}"#,
    )
    .unwrap();

    assert_eq!(
        msg,
        IncomingMessage::Request {
            id: json!(4),
            method: "session/new".into(),
            params: json!({"cwd": "/tmp"}),
        }
    );
}

#[test]
fn method_without_id_classifies_as_notification() {
    let msg = IncomingMessage::parse_line(
        r#"{"jsonrpc":"2.0","method":"session/cancel","params":{"sessionId":"s1"}}"#,
    )
    .unwrap();

    assert!(matches!(
        msg,
        IncomingMessage::Notification { ref method, .. } if method == "session/cancel"
    ));
}

#[test]
fn missing_params_become_null() {
    let msg = IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#).unwrap();

    match msg {
        IncomingMessage::Request { params, id, .. } => {
            assert_eq!(params, Value::Null);
            assert_eq!(id, json!("a"));
        }
        other => panic!("expected request, got: {other:?}"),
    }
}

#[test]
fn id_without_method_classifies_as_success_response() {
    let msg = IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":0,"result":{"ok":true}}"#).unwrap();

    assert_eq!(
        msg,
        IncomingMessage::Response {
            id: json!(0),
            outcome: Ok(json!({"ok": true})),
        }
    );
}

#[test]
fn response_without_result_resolves_to_null() {
    let msg = IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
    assert_eq!(
        msg,
        IncomingMessage::Response {
            id: json!(1),
            outcome: Ok(Value::Null),
        }
    );
}

#[test]
fn result_wins_over_a_null_error() {
    let msg = IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":0,"result":5,"error":null}"#).unwrap();
    assert_eq!(
        msg,
        IncomingMessage::Response {
            id: json!(0),
            outcome: Ok(json!(5)),
        }
    );
}

#[test]
fn result_wins_when_both_result_and_error_are_present() {
    let msg = IncomingMessage::parse_line(
        r#"{"jsonrpc":"2.0","id":1,"result":"done","error":{"code":-32603,"message":"Internal error"}}"#,
    )
    .unwrap();

    assert!(matches!(
        msg,
        IncomingMessage::Response { outcome: Ok(ref value), .. } if value == "done"
    ));
}

#[test]
fn null_error_without_result_resolves_to_null() {
    let msg = IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":3,"error":null}"#).unwrap();
    assert_eq!(
        msg,
        IncomingMessage::Response {
            id: json!(3),
            outcome: Ok(Value::Null),
        }
    );
}

#[test]
fn error_response_carries_request_error() {
    let msg = IncomingMessage::parse_line(
        r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found","data":{"details":"x"}}}"#,
    )
    .unwrap();

    match msg {
        IncomingMessage::Response { outcome: Err(err), .. } => {
            assert_eq!(err, RequestError::method_not_found(Some("x".into())));
        }
        other => panic!("expected error response, got: {other:?}"),
    }
}

#[test]
fn malformed_error_object_becomes_internal_error() {
    let msg = IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":2,"error":"boom"}"#).unwrap();

    match msg {
        IncomingMessage::Response { outcome: Err(err), .. } => {
            assert_eq!(err.code(), -32603);
            assert_eq!(err.details(), Some("\"boom\""));
        }
        other => panic!("expected error response, got: {other:?}"),
    }
}

#[test]
fn malformed_json_is_a_parse_error() {
    match IncomingMessage::parse_line("{not json") {
        Err(AppError::Parse(msg)) => assert!(msg.contains("malformed json"), "got: {msg}"),
        other => panic!("expected AppError::Parse, got: {other:?}"),
    }
}

#[test]
fn non_object_json_is_a_protocol_error() {
    assert!(matches!(
        IncomingMessage::parse_line("[1,2,3]"),
        Err(AppError::Protocol(_))
    ));
}

#[test]
fn object_without_method_or_id_is_a_protocol_error() {
    assert!(matches!(
        IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","result":1}"#),
        Err(AppError::Protocol(_))
    ));
}

#[test]
fn non_string_method_is_a_protocol_error() {
    assert!(matches!(
        IncomingMessage::parse_line(r#"{"jsonrpc":"2.0","id":1,"method":7}"#),
        Err(AppError::Protocol(_))
    ));
}

#[test]
fn request_id_accepts_integers_and_strings_only() {
    assert_eq!(RequestId::from_value(&json!(12)), Some(RequestId::Number(12)));
    assert_eq!(RequestId::from_value(&json!("r-1")), Some(RequestId::from("r-1")));
    assert_eq!(RequestId::from_value(&json!(1.5)), None);
    assert_eq!(RequestId::from_value(&Value::Null), None);
}

#[test]
fn outgoing_request_serializes_field_exact() {
    let id = RequestId::Number(3);
    let params = json!({"sessionId": "s1"});
    let frame = serde_json::to_string(&OutgoingRequest::new(&id, "session/prompt", &params)).unwrap();

    assert_eq!(
        frame,
        r#"{"jsonrpc":"2.0","id":3,"method":"session/prompt","params":{"sessionId":"s1"}}"#
    );
}

#[test]
fn outgoing_notification_omits_null_params() {
    let frame = serde_json::to_string(&OutgoingNotification::new("ping", &Value::Null)).unwrap();
    assert_eq!(frame, r#"{"jsonrpc":"2.0","method":"ping"}"#);
}

#[test]
fn outgoing_success_response_always_has_result() {
    let outcome = Ok(Value::Null);
    let frame = serde_json::to_string(&OutgoingResponse::new(&json!("x-9"), &outcome)).unwrap();
    assert_eq!(frame, r#"{"jsonrpc":"2.0","id":"x-9","result":null}"#);
}

#[test]
fn outgoing_error_response_nests_error_object() {
    let outcome = Err(RequestError::method_not_found(Some("nope".into())));
    let frame = serde_json::to_string(&OutgoingResponse::new(&json!(5), &outcome)).unwrap();
    assert_eq!(
        frame,
        r#"{"jsonrpc":"2.0","id":5,"error":{"code":-32601,"message":"Method not found","data":{"details":"nope"}}}"#
    );
}
