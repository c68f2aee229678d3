//! Serialized outbound write queue.
//!
//! Every frame bound for the peer goes through one [`WriteQueue`]. Frames are
//! appended to an unbounded [`mpsc`] channel and a single writer task drains
//! it, so exactly one write is in flight at a time and the bytes of two
//! frames never interleave.
//!
//! A failed write is reported on the `acp_wire::feedback` tracing target.
//! When nothing of the frame reached the sink the task moves on to the next
//! frame, so one broken write never stalls the frames queued behind it. When
//! only part of it did, the stream no longer ends on a frame boundary: the
//! task cancels its token and stops, which closes the connection instead of
//! gluing later frames onto the fragment.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Handle for enqueueing complete frames.
#[derive(Debug, Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl WriteQueue {
    /// Spawn the writer task over `sink` and return the queue handle.
    ///
    /// The task stops when `cancel` fires or every handle has been dropped.
    /// It cancels `cancel` itself after a write that left a partial frame.
    pub fn spawn<W>(sink: W, cancel: CancellationToken) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(sink, rx, cancel));
        (Self { tx }, handle)
    }

    /// Append `frame` to the queue. Returns once queued, not once written.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConnectionClosed`] if the writer task has stopped.
    pub fn enqueue(&self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| AppError::ConnectionClosed("write queue is closed".into()))
    }
}

/// Writer task: drain `rx` into `sink`, one frame at a time.
async fn run_writer<W>(mut sink: W, mut rx: mpsc::UnboundedReceiver<Bytes>, cancel: CancellationToken)
where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("acp writer: cancellation received, stopping");
                break;
            }

            frame = rx.recv() => {
                let Some(frame) = frame else {
                    debug!("acp writer: queue closed, stopping");
                    break;
                };

                if let Err(failure) = write_frame(&mut sink, &frame).await {
                    warn!(
                        target: "acp_wire::feedback",
                        error = %failure.error,
                        bytes = frame.len(),
                        written = failure.written,
                        "acp write error"
                    );
                    if failure.is_partial(frame.len()) {
                        warn!(
                            target: "acp_wire::feedback",
                            "acp writer: sink holds a partial frame, closing connection"
                        );
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    }
}

/// A failed frame write and how far it got.
struct WriteFailure {
    written: usize,
    error: std::io::Error,
}

impl WriteFailure {
    /// Some but not all bytes of the frame reached the sink.
    fn is_partial(&self, frame_len: usize) -> bool {
        self.written > 0 && self.written < frame_len
    }
}

async fn write_frame<W>(sink: &mut W, frame: &[u8]) -> std::result::Result<(), WriteFailure>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut written = 0;
    while written < frame.len() {
        match sink.write(&frame[written..]).await {
            Ok(0) => {
                return Err(WriteFailure {
                    written,
                    error: std::io::ErrorKind::WriteZero.into(),
                });
            }
            Ok(n) => written += n,
            Err(error) => return Err(WriteFailure { written, error }),
        }
    }
    sink.flush()
        .await
        .map_err(|error| WriteFailure { written, error })
}
