//! Native-messaging frame codec.
//!
//! The browser speaks to its native host over a byte stream of frames: a
//! 4-byte unsigned length in native byte order (little-endian on every
//! platform we ship to), followed by that many bytes of UTF-8 JSON. The
//! protocol's size ceilings are asymmetric and we preserve them exactly:
//! the browser accepts at most 1 MiB per message from the host, while the
//! host accepts up to 4 GiB from the browser.
//!
//! The codec never inspects message semantics; it turns bytes into
//! `serde_json::Value`s and back, nothing more.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::ProtocolError;

/// Ceiling for frames read from the browser (extension → host).
pub const MAX_INBOUND_FRAME: u64 = 4 * 1024 * 1024 * 1024;

/// Ceiling for frames written to the browser (host → extension).
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A request as it appears on the wire. `id` is present on framed
/// host↔extension traffic and absent on one-shot socket requests, where one
/// connection carries exactly one exchange and no correlation is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub command: String,
    #[serde(default)]
    pub params: Value,
}

/// A response as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireResponse {
    pub fn ok(id: Option<u64>, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Option<u64>, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Decoding half of a framed channel.
pub struct FrameReader<R> {
    inner: R,
    max_frame: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_frame: MAX_INBOUND_FRAME,
        }
    }

    pub fn with_limit(inner: R, max_frame: u64) -> Self {
        Self { inner, max_frame }
    }

    /// Read one frame. Returns `Ok(None)` only on a clean end of stream,
    /// i.e. zero bytes read where the next header would start. A stream that
    /// ends anywhere inside a frame is a truncation error.
    pub async fn read_message(&mut self) -> Result<Option<Value>, ProtocolError> {
        let mut header = [0u8; 4];
        let mut got = 0;
        while got < header.len() {
            let n = self.inner.read(&mut header[got..]).await?;
            if n == 0 {
                if got == 0 {
                    return Ok(None);
                }
                return Err(ProtocolError::Truncated {
                    expected: header.len(),
                    got,
                });
            }
            got += n;
        }

        let len = u32::from_le_bytes(header) as u64;
        if len == 0 {
            // The browser can send an empty frame; it decodes to an empty
            // object rather than an error.
            return Ok(Some(Value::Object(serde_json::Map::new())));
        }
        if len > self.max_frame {
            return Err(ProtocolError::FrameTooLarge {
                len,
                limit: self.max_frame,
            });
        }

        let mut payload = vec![0u8; len as usize];
        let mut read = 0;
        while read < payload.len() {
            let n = self.inner.read(&mut payload[read..]).await?;
            if n == 0 {
                return Err(ProtocolError::Truncated {
                    expected: payload.len(),
                    got: read,
                });
            }
            read += n;
        }

        Ok(Some(serde_json::from_slice(&payload)?))
    }
}

/// Encoding half of a framed channel.
pub struct FrameWriter<W> {
    inner: W,
    max_frame: usize,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            max_frame: MAX_OUTBOUND_FRAME,
        }
    }

    pub fn with_limit(inner: W, max_frame: usize) -> Self {
        Self { inner, max_frame }
    }

    /// Encode and write one frame. The size check happens before any byte
    /// touches the stream, and header plus payload go out as a single
    /// `write_all`, so a well-formed reader can never observe a partial
    /// frame from a failed encode.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> Result<(), ProtocolError> {
        let payload = serde_json::to_vec(message)?;
        if payload.len() > self.max_frame {
            return Err(ProtocolError::MessageTooLarge {
                len: payload.len(),
                limit: self.max_frame,
            });
        }

        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&payload);
        self.inner.write_all(&frame).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

/// A duplex framed channel: one reader half, one writer half.
pub struct FramedChannel<R, W> {
    pub reader: FrameReader<R>,
    pub writer: FrameWriter<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> FramedChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    pub fn into_split(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}

impl FramedChannel<BoxReader, BoxWriter> {
    /// Box an arbitrary reader/writer pair. The multiplexer stores channels
    /// this way so a reconnect can swap in a new transport.
    pub fn boxed<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::new(Box::new(reader) as BoxReader, Box::new(writer) as BoxWriter)
    }
}
