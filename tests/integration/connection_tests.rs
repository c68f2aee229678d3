//! Integration tests for request correlation, dispatch and shutdown.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::Notify;

use acp_wire::rpc::{HandlerFuture, MessageHandler};
use acp_wire::{AppError, RequestError, TransportConfig};

use super::test_helpers::{connect, echo_handler, join_io, response, RECV_TIMEOUT};

#[tokio::test]
async fn outbound_ids_start_at_zero_and_increase() {
    let (conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    for expected in 0..3 {
        let c = conn.clone();
        let call = tokio::spawn(async move { c.send_request("ping", Value::Null).await });

        let request = peer.recv().await;
        assert_eq!(request["id"], json!(expected));
        assert_eq!(request["method"], "ping");
        assert!(request.get("params").is_none());

        peer.send(&response(&request["id"], &json!(expected))).await;
        assert_eq!(call.await.unwrap().unwrap(), json!(expected));
    }
}

#[tokio::test]
async fn responses_in_reverse_order_reach_their_own_callers() {
    let (conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    let c = conn.clone();
    let first = tokio::spawn(async move { c.send_request("first", json!({"n": 1})).await });
    let first_req = peer.recv().await;

    let c = conn.clone();
    let second = tokio::spawn(async move { c.send_request("second", json!({"n": 2})).await });
    let second_req = peer.recv().await;

    assert_eq!(conn.pending_count().await, 2);

    peer.send(&response(&second_req["id"], &json!("two"))).await;
    peer.send(&response(&first_req["id"], &json!("one"))).await;

    assert_eq!(first.await.unwrap().unwrap(), json!("one"));
    assert_eq!(second.await.unwrap().unwrap(), json!("two"));
    assert_eq!(conn.pending_count().await, 0);
}

#[tokio::test]
async fn error_response_rejects_with_exact_error() {
    let (conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("fs/read_text_file", json!({})).await });
    let request = peer.recv().await;

    peer.send(&json!({
        "jsonrpc": "2.0",
        "id": request["id"],
        "error": {"code": -32002, "message": "Resource not found", "data": {"path": "/x"}}
    }))
    .await;

    match call.await.unwrap() {
        Err(AppError::Rpc(err)) => {
            assert_eq!(err.code(), -32002);
            assert_eq!(err.message(), "Resource not found");
            assert_eq!(err.data(), Some(&json!({"path": "/x"})));
        }
        other => panic!("expected AppError::Rpc, got: {other:?}"),
    }
}

#[tokio::test]
async fn dangling_response_is_ignored() {
    let (conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    peer.send(&response(&json!(99), &json!("stray"))).await;
    peer.send(&response(&json!("unknown"), &json!("stray"))).await;

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("ping", Value::Null).await });
    let request = peer.recv().await;
    peer.send(&response(&request["id"], &json!("pong"))).await;

    assert_eq!(call.await.unwrap().unwrap(), json!("pong"));
}

#[tokio::test]
async fn inbound_request_is_answered_with_handler_result() {
    let (_conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "id": 7, "method": "session/new", "params": {"cwd": "/"}}))
        .await;

    assert_eq!(
        peer.recv().await,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "result": {"method": "session/new", "params": {"cwd": "/"}}
        })
    );
}

#[tokio::test]
async fn string_request_ids_are_echoed_verbatim() {
    let (_conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "id": "req-abc", "method": "x"})).await;

    let reply = peer.recv().await;
    assert_eq!(reply["id"], json!("req-abc"));
    assert_eq!(reply["result"]["params"], Value::Null);
}

#[tokio::test]
async fn handler_error_becomes_error_response() {
    let handler: Arc<dyn MessageHandler> = Arc::new(|method: &str, _params: Value| -> HandlerFuture {
        let err = RequestError::method_not_found(Some(method.to_owned()));
        Box::pin(async move { Err(err) })
    });
    let (_conn, _io, mut peer) = connect(handler, TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "id": 3, "method": "nope"})).await;

    assert_eq!(
        peer.recv().await,
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "error": {"code": -32601, "message": "Method not found", "data": {"details": "nope"}}
        })
    );
}

#[tokio::test]
async fn panicking_handler_becomes_internal_error() {
    let handler: Arc<dyn MessageHandler> = Arc::new(|method: &str, _params: Value| -> HandlerFuture {
        let explode = method == "explode";
        Box::pin(async move {
            if explode {
                panic!("handler exploded");
            }
            Ok(Value::Null)
        })
    });
    let (_conn, _io, mut peer) = connect(handler, TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "id": 1, "method": "explode"})).await;
    let reply = peer.recv().await;
    assert_eq!(reply["id"], json!(1));
    assert_eq!(reply["error"]["code"], json!(-32603));
    assert_eq!(reply["error"]["data"]["details"], json!("handler exploded"));

    peer.send(&json!({"jsonrpc": "2.0", "id": 2, "method": "calm"})).await;
    assert_eq!(peer.recv().await, response(&json!(2), &Value::Null));
}

#[tokio::test]
async fn handler_panicking_before_its_future_becomes_internal_error() {
    let handler: Arc<dyn MessageHandler> = Arc::new(|method: &str, _params: Value| -> HandlerFuture {
        if method == "explode" {
            panic!("refused to build a future");
        }
        Box::pin(async { Ok(json!("built")) })
    });
    let (_conn, _io, mut peer) = connect(handler, TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "id": 7, "method": "explode"})).await;
    let reply = peer.recv().await;
    assert_eq!(reply["id"], json!(7));
    assert_eq!(reply["error"]["code"], json!(-32603));
    assert_eq!(
        reply["error"]["data"]["details"],
        json!("refused to build a future")
    );

    peer.send(&json!({"jsonrpc": "2.0", "id": 8, "method": "calm"})).await;
    assert_eq!(peer.recv().await, response(&json!(8), &json!("built")));
}

#[tokio::test]
async fn failing_notification_produces_no_response() {
    let handler: Arc<dyn MessageHandler> = Arc::new(|method: &str, _params: Value| -> HandlerFuture {
        let fail = method == "session/cancel";
        Box::pin(async move {
            if fail {
                Err(RequestError::internal_error(Some("cancel failed".into())))
            } else {
                Ok(json!("ok"))
            }
        })
    });
    let (_conn, _io, mut peer) = connect(handler, TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "method": "session/cancel", "params": {}})).await;
    peer.expect_silence(Duration::from_millis(200)).await;

    peer.send(&json!({"jsonrpc": "2.0", "id": 10, "method": "ping"})).await;
    assert_eq!(peer.recv().await, response(&json!(10), &json!("ok")));
}

#[tokio::test]
async fn slow_handler_does_not_block_later_requests() {
    let gate = Arc::new(Notify::new());
    let handler_gate = Arc::clone(&gate);
    let handler: Arc<dyn MessageHandler> = Arc::new(move |method: &str, _params: Value| -> HandlerFuture {
        let gate = Arc::clone(&handler_gate);
        let slow = method == "slow";
        Box::pin(async move {
            if slow {
                gate.notified().await;
            }
            Ok(json!(if slow { "slow" } else { "fast" }))
        })
    });
    let (_conn, _io, mut peer) = connect(handler, TransportConfig::default());

    peer.send(&json!({"jsonrpc": "2.0", "id": 1, "method": "slow"})).await;
    peer.send(&json!({"jsonrpc": "2.0", "id": 2, "method": "fast"})).await;

    assert_eq!(peer.recv().await, response(&json!(2), &json!("fast")));

    gate.notify_one();
    assert_eq!(peer.recv().await, response(&json!(1), &json!("slow")));
}

#[tokio::test]
async fn blank_and_non_message_lines_are_skipped() {
    let (_conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    peer.send_raw("\n   \n\r\n").await;
    peer.send_raw("[1,2,3]\n").await;
    peer.send_raw("{\"jsonrpc\":\"2.0\",\"result\":1}\n").await;
    peer.send(&json!({"jsonrpc": "2.0", "id": 1, "method": "still-alive"})).await;

    assert_eq!(peer.recv().await["result"]["method"], "still-alive");
}

#[tokio::test]
async fn frames_over_one_mebibyte_round_trip_by_default() {
    let (conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());
    let content = "x".repeat(2 * 1024 * 1024);

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("fs/read_text_file", json!({"path": "/big"})).await });
    let request = peer.recv().await;
    peer.send(&response(&request["id"], &json!({ "content": content }))).await;

    let result = tokio::time::timeout(RECV_TIMEOUT, call)
        .await
        .expect("large response never resolved the call")
        .unwrap()
        .unwrap();
    assert_eq!(result["content"].as_str().map(str::len), Some(2 * 1024 * 1024));
    assert_eq!(conn.pending_count().await, 0);

    peer.send(&json!({"jsonrpc": "2.0", "id": 1, "method": "big", "params": {"blob": content}})).await;
    let reply = peer.recv().await;
    assert_eq!(reply["id"], json!(1));
    assert_eq!(reply["result"]["params"]["blob"].as_str().map(str::len), Some(2 * 1024 * 1024));
}

#[tokio::test]
async fn line_over_configured_cap_fails_the_connection_and_pending_calls() {
    let config = TransportConfig {
        max_line_bytes: Some(128),
        ..TransportConfig::default()
    };
    let (conn, io, mut peer) = connect(echo_handler(), config);

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("fs/read_text_file", Value::Null).await });
    let request = peer.recv().await;

    peer.send(&response(&request["id"], &json!({"content": "x".repeat(1024)}))).await;

    match join_io(io).await {
        Err(AppError::Protocol(msg)) => assert!(msg.contains("128"), "got: {msg}"),
        other => panic!("expected AppError::Protocol, got: {other:?}"),
    }
    assert!(matches!(
        call.await.unwrap(),
        Err(AppError::ConnectionClosed(_))
    ));
}

#[tokio::test]
async fn invalid_utf8_inside_a_string_is_replaced_and_serving_continues() {
    let (_conn, io, mut peer) = connect(echo_handler(), TransportConfig::default());

    let mut frame = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"lossy\",\"params\":{\"s\":\"a".to_vec();
    frame.push(0xff);
    frame.extend_from_slice(b"b\"}}\n");
    peer.send_bytes(&frame).await;
    peer.send(&json!({"jsonrpc": "2.0", "id": 2, "method": "after"})).await;

    let first = peer.recv().await;
    assert_eq!(first["id"], json!(1));
    assert_eq!(first["result"]["params"]["s"], json!("a\u{fffd}b"));
    assert_eq!(peer.recv().await["result"]["method"], "after");
    assert!(!io.is_finished());
}

#[tokio::test]
async fn frame_split_across_writes_is_reassembled() {
    let (_conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    peer.send_raw("{\"jsonrpc\":\"2.0\",\"id\":4,").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    peer.send_raw("\"method\":\"split\"}\n").await;

    assert_eq!(peer.recv().await["result"]["method"], "split");
}

#[tokio::test]
async fn malformed_json_fails_the_connection_and_pending_calls() {
    let (conn, io, mut peer) = connect(echo_handler(), TransportConfig::default());

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("ping", Value::Null).await });
    let _request = peer.recv().await;

    peer.send_raw("{oops\n").await;

    assert!(matches!(join_io(io).await, Err(AppError::Parse(_))));
    assert!(matches!(
        call.await.unwrap(),
        Err(AppError::ConnectionClosed(_))
    ));
}

#[tokio::test]
async fn eof_resolves_serve_and_rejects_pending_calls() {
    let (conn, io, mut peer) = connect(echo_handler(), TransportConfig::default());

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("ping", Value::Null).await });
    let _request = peer.recv().await;

    peer.close().await;

    assert!(join_io(io).await.is_ok());
    assert!(matches!(
        call.await.unwrap(),
        Err(AppError::ConnectionClosed(_))
    ));
    assert_eq!(conn.pending_count().await, 0);
}

#[tokio::test]
async fn requests_after_close_fail_immediately() {
    let (conn, io, mut peer) = connect(echo_handler(), TransportConfig::default());

    peer.close().await;
    join_io(io).await.unwrap();

    assert!(matches!(
        conn.send_request("ping", Value::Null).await,
        Err(AppError::ConnectionClosed(_))
    ));
}

#[tokio::test]
async fn shutdown_stops_the_read_loop() {
    let (conn, io, _peer) = connect(echo_handler(), TransportConfig::default());

    conn.shutdown();

    assert!(join_io(io).await.is_ok());
}

#[tokio::test]
async fn configured_timeout_fails_unanswered_request() {
    let config = TransportConfig {
        request_timeout_seconds: 1,
        ..TransportConfig::default()
    };
    let (conn, _io, mut peer) = connect(echo_handler(), config);

    let c = conn.clone();
    let call = tokio::spawn(async move { c.send_request("never", Value::Null).await });
    let request = peer.recv().await;

    match call.await.unwrap() {
        Err(AppError::Timeout(msg)) => assert!(msg.contains("never"), "got: {msg}"),
        other => panic!("expected AppError::Timeout, got: {other:?}"),
    }
    assert_eq!(conn.pending_count().await, 0);

    // A late answer is dropped without disturbing the connection.
    peer.send(&response(&request["id"], &json!("late"))).await;
    peer.send(&json!({"jsonrpc": "2.0", "id": 1, "method": "after"})).await;
    assert_eq!(peer.recv().await["result"]["method"], "after");
}

#[tokio::test]
async fn notifications_carry_no_id() {
    let (conn, _io, mut peer) = connect(echo_handler(), TransportConfig::default());

    conn.send_notification("session/update", &json!({"sessionId": "s1"}))
        .unwrap();

    assert_eq!(
        peer.recv().await,
        json!({"jsonrpc": "2.0", "method": "session/update", "params": {"sessionId": "s1"}})
    );
}
