//! NDJSON frame codec.
//!
//! Splits the inbound byte stream on raw `\n` bytes with
//! [`tokio_util::codec::AnyDelimiterCodec`] and only then decodes each line
//! as UTF-8, so a multi-byte code point split across two reads is
//! reassembled before it is ever decoded. Invalid sequences become U+FFFD
//! rather than failing the stream.
//!
//! Use [`AcpCodec`] with [`tokio_util::codec::FramedRead`] for the inbound
//! side. The outbound side goes through [`encode_frame`], which produces the
//! complete bytes of one frame so the write queue can send it atomically.

use bytes::{Bytes, BytesMut};
use serde::Serialize;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Decoder, Encoder};
use tracing::{debug, warn};

use crate::{AppError, Result};

const NEWLINE: &[u8] = b"\n";

/// Line codec for bidirectional ACP streams.
///
/// # Decoder
///
/// Yields one `String` per `\n`-terminated line (a trailing `\r` is
/// stripped). Bytes that are not valid UTF-8 are replaced with U+FFFD.
/// Lines are unbounded unless a cap is set with
/// [`AcpCodec::with_max_line_bytes`]; a line over the cap is an
/// [`AppError::Protocol`] and ends the stream. At end of stream any
/// unterminated remainder is dropped, never delivered.
///
/// # Encoder
///
/// Strings are written as `item\n`.
#[derive(Debug)]
pub struct AcpCodec {
    inner: AnyDelimiterCodec,
    max_line_bytes: Option<usize>,
}

impl AcpCodec {
    /// Create a codec with no line limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: AnyDelimiterCodec::new(NEWLINE.to_vec(), NEWLINE.to_vec()),
            max_line_bytes: None,
        }
    }

    /// Create a codec that rejects lines longer than `max_line_bytes`.
    #[must_use]
    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            inner: AnyDelimiterCodec::new_with_max_length(
                NEWLINE.to_vec(),
                NEWLINE.to_vec(),
                max_line_bytes,
            ),
            max_line_bytes: Some(max_line_bytes),
        }
    }

    /// Build from an optional cap; `None` means unbounded.
    #[must_use]
    pub fn with_limit(max_line_bytes: Option<usize>) -> Self {
        max_line_bytes.map_or_else(Self::new, Self::with_max_line_bytes)
    }

    /// Configured line limit in bytes, if any.
    #[must_use]
    pub fn max_line_bytes(&self) -> Option<usize> {
        self.max_line_bytes
    }

    fn next_line(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        match self.inner.decode(src) {
            Ok(Some(chunk)) => Ok(Some(to_line(&chunk))),
            Ok(None) => Ok(None),
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                let limit = self.max_line_bytes.unwrap_or_default();
                warn!(max_line_bytes = limit, "acp codec: line too long");
                Err(AppError::Protocol(format!(
                    "inbound line exceeds {limit} bytes"
                )))
            }
            Err(AnyDelimiterCodecError::Io(err)) => Err(err.into()),
        }
    }
}

fn to_line(chunk: &[u8]) -> String {
    let chunk = chunk.strip_suffix(b"\r").unwrap_or(chunk);
    String::from_utf8_lossy(chunk).into_owned()
}

impl Default for AcpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AcpCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.next_line(src)
    }

    /// Drain remaining complete lines at EOF, then discard any partial frame.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        match self.next_line(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                if !src.is_empty() {
                    debug!(
                        bytes = src.len(),
                        "acp codec: discarding unterminated trailing frame"
                    );
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for AcpCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        // The max-length limit only applies to decoding.
        self.inner.encode(item, dst).map_err(|e| match e {
            AnyDelimiterCodecError::Io(err) => err.into(),
            AnyDelimiterCodecError::MaxChunkLengthExceeded => {
                AppError::Protocol("line too long".into())
            }
        })
    }
}

/// Serialize `message` into one complete `\n`-terminated frame.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] if `message` cannot be serialized to JSON.
pub fn encode_frame<T: Serialize + ?Sized>(message: &T) -> Result<Bytes> {
    let line = serde_json::to_string(message)
        .map_err(|e| AppError::Protocol(format!("failed to serialise outbound message: {e}")))?;

    let mut dst = BytesMut::with_capacity(line.len() + 1);
    AcpCodec::new().encode(line, &mut dst)?;
    Ok(dst.freeze())
}
