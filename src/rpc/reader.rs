//! Inbound frame read loop.
//!
//! Drives a [`FramedRead`] over the peer's byte source using [`AcpCodec`],
//! parses each non-blank line and hands the classified message to a routing
//! callback. Frames are decoded strictly in arrival order; what the callback
//! does with them (typically spawning a task) is up to the caller.
//!
//! | Line content                     | Outcome                               |
//! |----------------------------------|---------------------------------------|
//! | blank / whitespace               | skipped                               |
//! | over the configured cap          | loop stops with [`AppError::Protocol`]|
//! | not valid JSON                   | loop stops with [`AppError::Parse`]   |
//! | JSON, not a message shape        | logged at `WARN`, skipped             |
//! | request / notification / response| forwarded to the callback             |

use std::future::Future;

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::rpc::codec::AcpCodec;
use crate::rpc::message::IncomingMessage;
use crate::{AppError, Result};

/// Read frames from `incoming` until EOF, cancellation, or a fatal error.
///
/// # Errors
///
/// - [`AppError::Parse`] when a line is not valid JSON.
/// - [`AppError::Protocol`] when a line exceeds `max_line_bytes`.
/// - [`AppError::Io`] when the underlying read fails.
pub async fn run_reader<R, F, Fut>(
    incoming: R,
    max_line_bytes: Option<usize>,
    cancel: CancellationToken,
    mut on_message: F,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    F: FnMut(IncomingMessage) -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    let mut framed = FramedRead::new(incoming, AcpCodec::with_limit(max_line_bytes));

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("acp reader: cancellation received, stopping");
                return Ok(());
            }

            item = framed.next() => {
                let line = match item {
                    None => {
                        debug!("acp reader: EOF detected");
                        return Ok(());
                    }
                    Some(Err(err)) => return Err(err),
                    Some(Ok(line)) => line,
                };

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match IncomingMessage::parse_line(trimmed) {
                    Ok(message) => on_message(message).await,
                    Err(AppError::Protocol(msg)) => {
                        warn!(error = msg.as_str(), raw_line = trimmed, "acp reader: not a message, skipping");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
}
