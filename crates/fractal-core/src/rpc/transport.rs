//! Message transport
//!
//! Messages are framed LSP-style:
//!
//! ```text
//! Content-Length: <bytes>\r\n
//! \r\n
//! <json>
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

use super::error::{RpcError, RpcResult};
use super::protocol::Envelope;

/// Upper bound on a single frame body
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Outbound half of the channel
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send(&self, message: &Envelope) -> RpcResult<()>;
}

/// Longest accepted header line
pub const MAX_HEADER_LINE: usize = 8 * 1024;

/// Read one frame. `Ok(None)` on a clean end of stream between frames.
///
/// `InvalidFrame` means the frame was consumed and reading may continue.
/// `Desync` means the body length is unknown and the stream must be dropped.
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> RpcResult<Option<Value>> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut saw_header = false;

    loop {
        line.clear();
        let bytes_read = (&mut *reader).take(MAX_HEADER_LINE as u64).read_line(&mut line).await?;
        if bytes_read == 0 {
            if saw_header {
                return Err(RpcError::InvalidFrame("Connection closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if bytes_read == MAX_HEADER_LINE && !line.ends_with('\n') {
            return Err(RpcError::Desync("Header line too long".to_string()));
        }

        let line = line.trim();
        if line.is_empty() {
            if saw_header {
                break;
            }
            // Stray blank line between frames
            continue;
        }
        saw_header = true;

        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                let parsed = value
                    .trim()
                    .parse()
                    .map_err(|_| RpcError::Desync(format!("Invalid Content-Length: {}", value.trim())))?;
                content_length = Some(parsed);
            }
        }
    }

    let length = content_length.ok_or_else(|| RpcError::Desync("Missing Content-Length header".to_string()))?;
    if length > MAX_FRAME_BYTES {
        let discarded = tokio::io::copy(&mut (&mut *reader).take(length as u64), &mut tokio::io::sink()).await?;
        if discarded < length as u64 {
            return Err(RpcError::InvalidFrame("Connection closed mid-frame".to_string()));
        }
        return Err(RpcError::InvalidFrame(format!("Frame of {} bytes is too large", length)));
    }

    let mut content = vec![0u8; length];
    reader.read_exact(&mut content).await?;
    serde_json::from_slice(&content)
        .map(Some)
        .map_err(|e| RpcError::InvalidFrame(format!("Body is not JSON: {}", e)))
}

/// Write one frame and flush
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Envelope) -> RpcResult<()> {
    let content = serde_json::to_string(message)?;
    let header = format!("Content-Length: {}\r\n\r\n", content.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(content.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// `MessageChannel` over any async writer (stdout, a socket, a duplex pipe)
pub struct FramedWriter<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> FramedWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> MessageChannel for FramedWriter<W> {
    async fn send(&self, message: &Envelope) -> RpcResult<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, message).await
    }
}

/// In-process channel; the receiving end gets every sent envelope
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl MemoryChannel {
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageChannel for MemoryChannel {
    async fn send(&self, message: &Envelope) -> RpcResult<()> {
        self.tx.send(message.clone()).map_err(|_| RpcError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcResponseEnvelope;
    use serde_json::json;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (client, server) = tokio::io::duplex(1024);
        let writer = FramedWriter::new(client);
        let message = Envelope::RpcResponse(RpcResponseEnvelope::ok("rpc-1", json!("héllo")));
        writer.send(&message).await.unwrap();
        writer.send(&Envelope::ShowContext).await.unwrap();
        drop(writer);

        let mut reader = BufReader::new(server);
        let first = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(first["result"], "héllo");
        let second = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(second["type"], "show-context");
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_frames() {
        let mut missing = BufReader::new(&b"X-Other: 1\r\n\r\n{}"[..]);
        assert!(matches!(read_frame(&mut missing).await, Err(RpcError::Desync(_))));

        let mut garbled = BufReader::new(&b"Content-Length: lots\r\n\r\n{}"[..]);
        assert!(matches!(read_frame(&mut garbled).await, Err(RpcError::Desync(_))));

        let long_header = format!("X-Pad: {}\r\n\r\n", "a".repeat(MAX_HEADER_LINE));
        let mut unbounded = BufReader::new(long_header.as_bytes());
        assert!(matches!(read_frame(&mut unbounded).await, Err(RpcError::Desync(_))));

        let mut not_json = BufReader::new(&b"Content-Length: 3\r\n\r\nabc"[..]);
        assert!(matches!(read_frame(&mut not_json).await, Err(RpcError::InvalidFrame(_))));

        let mut truncated = BufReader::new(&b"Content-Length: 10\r\n"[..]);
        assert!(read_frame(&mut truncated).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_skipped() {
        let length = MAX_FRAME_BYTES + 16;
        let mut input = format!("Content-Length: {}\r\n\r\n", length).into_bytes();
        input.extend(std::iter::repeat(b'x').take(length));
        input.extend_from_slice(b"Content-Length: 23\r\n\r\n{\"type\":\"show-context\"}");

        let mut reader = BufReader::new(&input[..]);
        let first = read_frame(&mut reader).await;
        assert!(matches!(first, Err(RpcError::InvalidFrame(ref m)) if m.contains("too large")));

        let second = read_frame(&mut reader).await.unwrap().unwrap();
        assert_eq!(second["type"], "show-context");
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }
}
