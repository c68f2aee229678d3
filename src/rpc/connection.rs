//! Bidirectional JSON-RPC connection core.
//!
//! A [`Connection`] owns three pieces of state:
//!
//! - the pending-call table: outbound request id → [`oneshot`] completion
//!   handle, inserted by [`Connection::send_request`] and removed when the
//!   matching response arrives;
//! - the id counter, starting at `0`;
//! - the [`WriteQueue`] through which every outbound frame is written.
//!
//! [`Connection::serve`] installs a [`MessageHandler`] and starts the read
//! loop. Each inbound request or notification is handled on its own task, so
//! a slow handler never holds up decoding of the next frame, and responses
//! may leave in a different order than their requests arrived.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::TransportConfig;
use crate::rpc::codec::encode_frame;
use crate::rpc::error::RequestError;
use crate::rpc::message::{
    IncomingMessage, OutgoingNotification, OutgoingRequest, OutgoingResponse, RequestId,
};
use crate::rpc::reader::run_reader;
use crate::rpc::writer::WriteQueue;
use crate::{AppError, Result};

/// Outcome of one handler invocation.
pub type HandlerResult = std::result::Result<Value, RequestError>;

/// Future returned by a [`MessageHandler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Dispatch target for inbound requests and notifications.
///
/// For requests the outcome becomes the response; for notifications it is
/// only logged. Returning an error other than a [`RequestError`] is not
/// possible by construction. Panics in `handle` itself or inside the
/// returned future are caught and reported as `Internal error`.
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle `method` with raw `params`.
    fn handle(&self, method: &str, params: Value) -> HandlerFuture;
}

impl<F> MessageHandler for F
where
    F: Fn(&str, Value) -> HandlerFuture + Send + Sync + 'static,
{
    fn handle(&self, method: &str, params: Value) -> HandlerFuture {
        self(method, params)
    }
}

type PendingTable = HashMap<RequestId, oneshot::Sender<HandlerResult>>;

struct Inner {
    /// `None` once the read loop has stopped; no response can arrive after that.
    pending: Mutex<Option<PendingTable>>,
    next_request_id: AtomicI64,
    writes: WriteQueue,
    config: TransportConfig,
    cancel: CancellationToken,
}

/// Shared handle to one connection. Cheap to clone.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("next_request_id", &self.inner.next_request_id)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a connection writing to `outgoing`.
    ///
    /// Spawns the writer task, so this must run inside a tokio runtime.
    pub fn new<W>(outgoing: W, config: TransportConfig) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (writes, _writer) = WriteQueue::spawn(outgoing, cancel.clone());

        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(Some(HashMap::new())),
                next_request_id: AtomicI64::new(0),
                writes,
                config,
                cancel,
            }),
        }
    }

    /// Install `handler` and start reading frames from `incoming`.
    ///
    /// The returned task resolves when the stream ends (`Ok`), when
    /// [`Connection::shutdown`] is called (`Ok`), or on a fatal read fault.
    /// Either way every call still pending at that point fails with
    /// [`AppError::ConnectionClosed`].
    ///
    /// # Errors
    ///
    /// The task yields [`AppError::Parse`] for a malformed line,
    /// [`AppError::Protocol`] for a line over `max_line_bytes` and
    /// [`AppError::Io`] for a read failure.
    pub fn serve<R>(&self, incoming: R, handler: Arc<dyn MessageHandler>) -> JoinHandle<Result<()>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let result = run_reader(
                incoming,
                inner.config.max_line_bytes,
                inner.cancel.clone(),
                |message| route(&inner, &handler, message),
            )
            .await;

            if let Err(err) = &result {
                error!(error = %err, "acp connection: read loop failed");
            }

            let abandoned = inner.pending.lock().await.take();
            if let Some(abandoned) = abandoned {
                if !abandoned.is_empty() {
                    debug!(
                        count = abandoned.len(),
                        "acp connection: failing pending calls on close"
                    );
                }
            }

            result
        })
    }

    /// Send a request and wait for its correlated response.
    ///
    /// Waits indefinitely unless `request_timeout_seconds` is configured.
    ///
    /// # Errors
    ///
    /// - [`AppError::Rpc`] when the peer answered with an error response.
    /// - [`AppError::ConnectionClosed`] when the connection closed first.
    /// - [`AppError::Timeout`] when the configured timeout elapsed.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = RequestId::Number(self.inner.next_request_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();

        match self.inner.pending.lock().await.as_mut() {
            Some(pending) => {
                pending.insert(id.clone(), tx);
            }
            None => {
                return Err(AppError::ConnectionClosed(format!(
                    "cannot send `{method}`: connection is closed"
                )))
            }
        }

        let queued = encode_frame(&OutgoingRequest::new(&id, method, &params))
            .and_then(|frame| self.inner.writes.enqueue(frame));
        if let Err(err) = queued {
            self.forget(&id).await;
            return Err(err);
        }
        debug!(method, %id, "acp connection: request sent");

        let outcome = match self.inner.config.request_timeout() {
            None => rx.await,
            Some(limit) => {
                if let Ok(outcome) = tokio::time::timeout(limit, rx).await {
                    outcome
                } else {
                    self.forget(&id).await;
                    return Err(AppError::Timeout(format!(
                        "no response to `{method}` (id {id}) within {}s",
                        limit.as_secs()
                    )));
                }
            }
        };

        match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(AppError::Rpc(err)),
            Err(_) => Err(AppError::ConnectionClosed(format!(
                "connection closed before `{method}` (id {id}) was answered"
            ))),
        }
    }

    /// Send a notification. Returns once the frame is queued.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConnectionClosed`] if the writer has stopped.
    pub fn send_notification(&self, method: &str, params: &Value) -> Result<()> {
        let frame = encode_frame(&OutgoingNotification::new(method, params))?;
        self.inner.writes.enqueue(frame)?;
        debug!(method, "acp connection: notification sent");
        Ok(())
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.inner
            .pending
            .lock()
            .await
            .as_ref()
            .map_or(0, HashMap::len)
    }

    /// Stop the read loop and the writer task.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    async fn forget(&self, id: &RequestId) {
        if let Some(pending) = self.inner.pending.lock().await.as_mut() {
            pending.remove(id);
        }
    }
}

// ── Inbound routing ───────────────────────────────────────────────────────────

async fn route(inner: &Arc<Inner>, handler: &Arc<dyn MessageHandler>, message: IncomingMessage) {
    match message {
        IncomingMessage::Request { id, method, params } => {
            let inner = Arc::clone(inner);
            let handler = Arc::clone(handler);
            tokio::spawn(async move {
                let outcome = invoke(handler.as_ref(), &method, params).await;
                if let Err(err) = &outcome {
                    debug!(method = method.as_str(), %id, code = err.code(), "acp connection: request failed");
                }
                let queued = encode_frame(&OutgoingResponse::new(&id, &outcome))
                    .and_then(|frame| inner.writes.enqueue(frame));
                if let Err(err) = queued {
                    warn!(method = method.as_str(), %id, error = %err, "acp connection: response not queued");
                }
            });
        }
        IncomingMessage::Notification { method, params } => {
            let handler = Arc::clone(handler);
            tokio::spawn(async move {
                if let Err(err) = invoke(handler.as_ref(), &method, params).await {
                    warn!(method = method.as_str(), error = %err, "acp connection: notification handler failed");
                }
            });
        }
        IncomingMessage::Response { id, outcome } => {
            let waiter = match RequestId::from_value(&id) {
                Some(key) => inner
                    .pending
                    .lock()
                    .await
                    .as_mut()
                    .and_then(|pending| pending.remove(&key)),
                None => None,
            };

            match waiter {
                Some(tx) => {
                    // The caller may have given up waiting; nothing to do then.
                    let _ = tx.send(outcome);
                }
                None => debug!(%id, "acp connection: dropping response for unknown id"),
            }
        }
    }
}

/// Run `handler`, turning a panic while building or polling its future
/// into an `Internal error`.
async fn invoke(handler: &dyn MessageHandler, method: &str, params: Value) -> HandlerResult {
    let built = std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(method, params)));
    let future = match built {
        Ok(future) => future,
        Err(panic) => return Err(RequestError::internal_error(panic_message(panic.as_ref()))),
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(RequestError::internal_error(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> Option<String> {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
}
