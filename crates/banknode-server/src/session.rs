use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use banknode_protocol::{Executor, MAX_LINE_BYTES, PARSE_ERROR_CODE, ParseError, Response};

/// Bytes read per chunk: the longest accepted line plus `\r\n`.
const READ_LIMIT: u64 = MAX_LINE_BYTES as u64 + 2;

/// Limits applied to every connection.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    /// Unparsable lines tolerated before the connection is closed.
    pub max_malformed_lines: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            max_malformed_lines: None,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    PeerClosed,
    IdleTimeout,
    TooManyMalformed,
    Io(std::io::ErrorKind),
}

/// Runs the request/response loop of one client connection.
#[derive(Clone)]
pub struct SessionHandler {
    executor: Executor,
    config: SessionConfig,
}

impl SessionHandler {
    pub fn new(executor: Executor, config: SessionConfig) -> Self {
        Self { executor, config }
    }

    /// Serve `stream` until the peer leaves, goes idle, or sends too much garbage.
    ///
    /// Each non-blank line gets exactly one response line.
    pub async fn handle<S>(&self, stream: S) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(128);
        let mut malformed = 0u32;
        let mut failed = 0u64;
        let mut served = 0u64;

        let end = loop {
            let inbound = match self.read_line(&mut reader, &mut buf).await {
                Ok(inbound) => inbound,
                Err(end) => break end,
            };

            let response = match inbound {
                Inbound::TooLong => {
                    warn!(limit = MAX_LINE_BYTES, "Rejected over-long line");
                    Response::from(ParseError::LineTooLong(MAX_LINE_BYTES))
                }
                Inbound::Line => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!(line, "Command received");
                    self.executor.handle_line(line).await
                }
            };
            if response.is_error() {
                failed += 1;
                if response.error_code() == Some(PARSE_ERROR_CODE) {
                    malformed += 1;
                }
            }
            served += 1;

            let mut out = response.to_string();
            out.push('\n');
            if let Err(err) = write_line(&mut writer, &out).await {
                break SessionEnd::Io(err.kind());
            }

            if self
                .config
                .max_malformed_lines
                .is_some_and(|max| malformed > max)
            {
                break SessionEnd::TooManyMalformed;
            }
        };

        match end {
            SessionEnd::Io(kind) => warn!(?kind, served, failed, "Session aborted"),
            _ => info!(?end, served, failed, "Session closed"),
        }
        if let Err(err) = writer.shutdown().await {
            debug!(error = %err, "Shutdown of client stream failed");
        }
        end
    }

    /// Read the next line into `buf`, never holding more than `READ_LIMIT` bytes of it.
    ///
    /// The remainder of an over-long line is read and dropped.
    async fn read_line<R>(&self, reader: &mut R, buf: &mut Vec<u8>) -> Result<Inbound, SessionEnd>
    where
        R: AsyncBufRead + Unpin,
    {
        buf.clear();
        if self.read_chunk(reader, buf).await? == 0 {
            return Err(SessionEnd::PeerClosed);
        }

        let line: &[u8] = buf;
        let body = line.strip_suffix(b"\n").unwrap_or(line);
        let body = body.strip_suffix(b"\r").unwrap_or(body);
        if body.len() <= MAX_LINE_BYTES {
            return Ok(Inbound::Line);
        }
        let complete = buf.ends_with(b"\n") || (buf.len() as u64) < READ_LIMIT;
        buf.clear();
        if complete {
            return Ok(Inbound::TooLong);
        }

        loop {
            buf.clear();
            let n = self.read_chunk(reader, buf).await?;
            if n == 0 || buf.ends_with(b"\n") {
                buf.clear();
                return Ok(Inbound::TooLong);
            }
        }
    }

    async fn read_chunk<R>(&self, reader: &mut R, buf: &mut Vec<u8>) -> Result<usize, SessionEnd>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut limited = (&mut *reader).take(READ_LIMIT);
        let read = limited.read_until(b'\n', buf);
        match timeout(self.config.idle_timeout, read).await {
            Err(_) => Err(SessionEnd::IdleTimeout),
            Ok(Err(err)) => Err(SessionEnd::Io(err.kind())),
            Ok(Ok(n)) => Ok(n),
        }
    }
}

enum Inbound {
    Line,
    TooLong,
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use banknode_ledger::{LedgerStore, MemoryStore};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, DuplexStream};

    async fn handler(config: SessionConfig) -> SessionHandler {
        let store = LedgerStore::with_backend(Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        SessionHandler::new(Executor::new("10.0.0.1", Arc::new(store)), config)
    }

    async fn read_all(mut client: DuplexStream) -> String {
        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_one_response_per_line() {
        let handler = handler(SessionConfig::default()).await;
        let (mut client, server) = tokio::io::duplex(4096);

        client
            .write_all(b"BC\r\n\nAC\nAD 10000/10.0.0.1 7\nNOPE\nBN\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        let end = handler.handle(server).await;
        assert_eq!(end, SessionEnd::PeerClosed);

        let lines: Vec<String> = read_all(client).await.lines().map(String::from).collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "BC 10.0.0.1");
        assert_eq!(lines[1], "AC 10000/10.0.0.1");
        assert_eq!(lines[2], "AD 10000/10.0.0.1 7.00");
        assert!(lines[3].starts_with("ER PARSE"));
        assert_eq!(lines[4], "BN 1");
    }

    #[tokio::test]
    async fn test_idle_timeout_closes_session() {
        let handler = handler(SessionConfig {
            idle_timeout: Duration::from_millis(50),
            max_malformed_lines: None,
        })
        .await;
        let (client, server) = tokio::io::duplex(1024);

        let end = handler.handle(server).await;
        assert_eq!(end, SessionEnd::IdleTimeout);
        assert_eq!(read_all(client).await, "");
    }

    #[tokio::test]
    async fn test_malformed_budget() {
        let handler = handler(SessionConfig {
            idle_timeout: Duration::from_secs(5),
            max_malformed_lines: Some(1),
        })
        .await;
        let (mut client, server) = tokio::io::duplex(4096);

        client.write_all(b"X1\nBN\nX2\nBN\n").await.unwrap();

        let end = handler.handle(server).await;
        assert_eq!(end, SessionEnd::TooManyMalformed);

        let out = read_all(client).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ER PARSE"));
        assert_eq!(lines[1], "BN 0");
        assert!(lines[2].starts_with("ER PARSE"));
    }

    #[tokio::test]
    async fn test_over_long_line_is_rejected_and_skipped() {
        let handler = handler(SessionConfig::default()).await;
        let (mut client, server) = tokio::io::duplex(256 * 1024);

        let mut input = vec![b'A'; 100_000];
        input.extend_from_slice(b"\nBN\n");
        input.extend_from_slice(&[b'B'; MAX_LINE_BYTES + 1]);
        input.extend_from_slice(b"\r\n");
        input.extend_from_slice(&[b'C'; MAX_LINE_BYTES]);
        input.extend_from_slice(b"\n");
        client.write_all(&input).await.unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(handler.handle(server).await, SessionEnd::PeerClosed);

        let out = read_all(client).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "ER PARSE Line longer than 1024 bytes");
        assert_eq!(lines[1], "BN 0");
        assert_eq!(lines[2], "ER PARSE Line longer than 1024 bytes");
        // A line at the limit is parsed; its unknown opcode is quoted only in part.
        assert!(lines[3].starts_with("ER PARSE Unknown command"));
        assert!(lines[3].len() < 100);
    }

    #[tokio::test]
    async fn test_over_long_lines_count_as_malformed() {
        let handler = handler(SessionConfig {
            idle_timeout: Duration::from_secs(5),
            max_malformed_lines: Some(0),
        })
        .await;
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        let mut input = vec![b'x'; 5_000];
        input.extend_from_slice(b"\nBN\n");
        client.write_all(&input).await.unwrap();

        assert_eq!(handler.handle(server).await, SessionEnd::TooManyMalformed);
        assert_eq!(read_all(client).await, "ER PARSE Line longer than 1024 bytes\n");
    }

    #[tokio::test]
    async fn test_failed_commands_keep_session_open() {
        let handler = handler(SessionConfig {
            idle_timeout: Duration::from_secs(5),
            max_malformed_lines: Some(0),
        })
        .await;
        let (mut client, server) = tokio::io::duplex(4096);

        client
            .write_all(b"AB 10000/10.0.0.1\nAD 10000/10.0.0.2 1\nBA\n")
            .await
            .unwrap();
        client.shutdown().await.unwrap();

        assert_eq!(handler.handle(server).await, SessionEnd::PeerClosed);
        let out = read_all(client).await;
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("ER NOT_FOUND"));
        assert!(lines[1].starts_with("ER FOREIGN_ACCOUNT"));
        assert_eq!(lines[2], "BA 0.00");
    }
}
