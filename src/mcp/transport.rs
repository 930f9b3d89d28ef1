//! Line-delimited stdio transport
//!
//! [`LineReader`] pulls one newline-terminated message at a time, running each
//! read on its own task so the server loop can stop waiting on it.
//! [`ResponseWriter`] emits one complete envelope per write.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{McpError, Result};
use crate::mcp::types::JsonRpcResponse;

/// Outcome of one successful read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line with its delimiter stripped
    Line(String),
    /// The peer closed the stream
    Eof,
}

type PendingRead<R> = JoinHandle<(BufReader<R>, io::Result<ReadLine>)>;

/// Reads newline-delimited messages.
///
/// `next_line` is cancel-safe: if its future is dropped while a read is in
/// flight, the read keeps running and the next call picks up its result.
pub struct LineReader<R> {
    reader: Option<BufReader<R>>,
    pending: Option<PendingRead<R>>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(input: R) -> Self {
        Self {
            reader: Some(BufReader::new(input)),
            pending: None,
        }
    }

    /// Whether a read has been started and not yet delivered
    pub fn is_reading(&self) -> bool {
        self.pending.is_some()
    }

    /// Read the next line
    pub async fn next_line(&mut self) -> io::Result<ReadLine> {
        // The handle stays in `pending` while awaited so a dropped call
        // leaves the read for the next one
        let handle = match &mut self.pending {
            Some(handle) => handle,
            pending @ None => {
                let reader = self
                    .reader
                    .take()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "input stream lost"))?;
                pending.insert(tokio::spawn(read_one(reader)))
            }
        };
        let joined = handle.await;
        self.pending = None;

        let (reader, result) = joined.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.reader = Some(reader);
        result
    }
}

async fn read_one<R>(mut reader: BufReader<R>) -> (BufReader<R>, io::Result<ReadLine>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let result = match reader.read_until(b'\n', &mut buf).await {
        Ok(0) => Ok(ReadLine::Eof),
        Ok(_) => {
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }
            Ok(ReadLine::Line(String::from_utf8_lossy(&buf).into_owned()))
        }
        Err(e) => Err(e),
    };
    (reader, result)
}

/// Writes response envelopes, one per line.
pub struct ResponseWriter<W> {
    inner: W,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Serialize `response` and write it with its trailing newline in a
    /// single write, then flush.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> Result<()> {
        let mut buf = serde_json::to_vec(response)?;
        buf.push(b'\n');

        debug!(bytes = buf.len(), "Sending response");

        self.inner
            .write_all(&buf)
            .await
            .map_err(|e| transport_error("write", e))?;
        self.inner
            .flush()
            .await
            .map_err(|e| transport_error("flush", e))?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

pub(crate) fn transport_error(op: &str, err: io::Error) -> McpError {
    McpError::TransportError {
        message: format!("{} failed: {}", op, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::RequestId;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_reads_lines_and_strips_delimiters() {
        let input = tokio_test::io::Builder::new()
            .read(b"first\r\nsec")
            .read(b"ond\nlast")
            .build();
        let mut reader = LineReader::new(input);

        assert_eq!(reader.next_line().await.unwrap(), ReadLine::Line("first".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadLine::Line("second".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadLine::Line("last".into()));
        assert_eq!(reader.next_line().await.unwrap(), ReadLine::Eof);
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let input = tokio_test::io::Builder::new()
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let mut reader = LineReader::new(input);

        let err = reader.next_line().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_abandoned_read_is_resumed_not_lost() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(server);

        let waited = tokio::time::timeout(Duration::from_millis(20), reader.next_line()).await;
        assert!(waited.is_err());
        assert!(reader.is_reading());

        client.write_all(b"hello\n").await.unwrap();
        assert_eq!(reader.next_line().await.unwrap(), ReadLine::Line("hello".into()));
        assert!(!reader.is_reading());

        drop(client);
        assert_eq!(reader.next_line().await.unwrap(), ReadLine::Eof);
    }

    #[tokio::test]
    async fn test_writer_emits_one_line_per_response() {
        let mut out = Vec::new();
        {
            let mut writer = ResponseWriter::new(&mut out);
            writer
                .write_response(&JsonRpcResponse::success(RequestId::from(1), json!("pong")))
                .await
                .unwrap();
            writer
                .write_response(&JsonRpcResponse::success(RequestId::from(2), json!({})))
                .await
                .unwrap();
        }

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"jsonrpc":"2.0","id":1,"result":"pong"}"#);
        assert!(text.ends_with('\n'));
    }
}
