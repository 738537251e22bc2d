//! Backend forwarding: proxies a request the middleware chain didn't
//! resolve to a built-in route through the pooled connection to
//! whichever backend the round-robin cursor picks. A connect or read
//! timeout marks one failure on the backend and maps to 504; a
//! refused/reset connection or a malformed upstream response maps to 502.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::backend::{Backend, BackendPool, ConnectionPool};
use crate::error::{BackendError, GatewayError};

use super::middleware::ResponseContext;

const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

pub struct BackendDispatcherConfig {
    pub max_connections_per_backend: usize,
    pub max_idle_time: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

/// Owns the backend pool together with one pooled-connection cache per
/// backend, and forwards requests the router didn't recognize as a
/// built-in.
pub struct BackendDispatcher {
    pool: BackendPool,
    connections: Vec<Mutex<ConnectionPool<TcpStream>>>,
    config: BackendDispatcherConfig,
}

impl BackendDispatcher {
    #[must_use]
    pub fn new(pool: BackendPool, config: BackendDispatcherConfig) -> Self {
        let connections = (0..pool.len()).map(|_| Mutex::new(ConnectionPool::new(config.max_connections_per_backend, config.max_idle_time))).collect();
        Self { pool, connections, config }
    }

    /// Exposes the pool so a caller can run active health probing
    /// alongside live-traffic dispatch.
    #[must_use]
    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    pub async fn forward(&self, method: &str, path: &str, body: &[u8]) -> ResponseContext {
        let index = self.pool.next();
        let Some(backend) = self.pool.get(index) else {
            return from_backend_error(BackendError::NoBackendsAvailable);
        };

        let stream = match self.acquire(index, backend).await {
            Ok(stream) => stream,
            Err(err) => {
                backend.health.record_failure();
                return from_backend_error(err);
            }
        };

        match round_trip(stream, backend, method, path, body, self.config.read_timeout).await {
            Ok((response, stream)) => {
                backend.health.record_success();
                self.release(index, stream).await;
                response
            }
            Err(err) => {
                backend.health.record_failure();
                from_backend_error(err)
            }
        }
    }

    async fn acquire(&self, index: usize, backend: &Backend) -> Result<TcpStream, BackendError> {
        let now = Instant::now();
        if let Some(stream) = self.connections[index].lock().await.take_idle(now) {
            return Ok(stream);
        }
        self.connections[index].lock().await.reserve_slot()?;
        tokio::time::timeout(self.config.connect_timeout, TcpStream::connect((backend.host.as_str(), backend.port)))
            .await
            .map_err(|_| BackendError::ConnectTimeout)?
            .map_err(|_| BackendError::ConnectionFailed)
    }

    async fn release(&self, index: usize, stream: TcpStream) {
        let now = Instant::now();
        let local = stream.local_addr().ok();
        let mut pool = self.connections[index].lock().await;
        pool.insert_active(stream, now);
        pool.return_idle(|s| s.local_addr().ok() == local, now);
    }
}

async fn round_trip(mut stream: TcpStream, backend: &Backend, method: &str, path: &str, body: &[u8], read_timeout: Duration) -> Result<(ResponseContext, TcpStream), BackendError> {
    let request = format_request(method, path, &backend.host, body);
    tokio::time::timeout(read_timeout, stream.write_all(&request)).await.map_err(|_| BackendError::ReadTimeout)?.map_err(|_| BackendError::ConnectionFailed)?;

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() >= MAX_RESPONSE_SIZE {
            return Err(BackendError::InvalidResponse);
        }
        let n = tokio::time::timeout(read_timeout, stream.read(&mut chunk)).await.map_err(|_| BackendError::ReadTimeout)?.map_err(|_| BackendError::ConnectionFailed)?;
        if n == 0 {
            return Err(BackendError::InvalidResponse);
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let (status, reason) = parse_status_line(&buf[..header_end])?;
    let content_length = parse_content_length(&buf[..header_end]).unwrap_or(0);
    let body_start = header_end + 4;

    while buf.len() - body_start < content_length {
        if buf.len() >= MAX_RESPONSE_SIZE {
            return Err(BackendError::InvalidResponse);
        }
        let n = tokio::time::timeout(read_timeout, stream.read(&mut chunk)).await.map_err(|_| BackendError::ReadTimeout)?.map_err(|_| BackendError::ConnectionFailed)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = buf[body_start..buf.len().min(body_start + content_length)].to_vec();
    Ok((ResponseContext { status, reason, body }, stream))
}

fn format_request(method: &str, path: &str, host: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!("{method} {path} HTTP/1.1\r\nHost: {host}\r\nConnection: keep-alive\r\nContent-Length: {}\r\n\r\n", body.len()).into_bytes();
    out.extend_from_slice(body);
    out
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_status_line(header: &[u8]) -> Result<(u16, &'static str), BackendError> {
    let line_end = header.iter().position(|&b| b == b'\r').ok_or(BackendError::InvalidResponse)?;
    let line = std::str::from_utf8(&header[..line_end]).map_err(|_| BackendError::InvalidResponse)?;
    let mut parts = line.splitn(3, ' ');
    let _http_version = parts.next().ok_or(BackendError::InvalidResponse)?;
    let status: u16 = parts.next().ok_or(BackendError::InvalidResponse)?.parse().map_err(|_| BackendError::InvalidResponse)?;
    Ok((status, status_reason(status)))
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

fn parse_content_length(header: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(header).ok()?;
    text.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn from_backend_error(err: BackendError) -> ResponseContext {
    ResponseContext::from_error(&GatewayError::Backend(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_status_line() {
        let header = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n";
        let (status, reason) = parse_status_line(header).unwrap();
        assert_eq!(status, 200);
        assert_eq!(reason, "OK");
    }

    #[test]
    fn extracts_content_length_case_insensitively() {
        let header = b"HTTP/1.1 200 OK\r\ncontent-LENGTH: 42\r\n";
        assert_eq!(parse_content_length(header), Some(42));
    }

    #[test]
    fn missing_status_line_is_an_invalid_response() {
        assert!(parse_status_line(b"garbage").is_err());
    }

    #[test]
    fn finds_the_blank_line_terminating_headers() {
        let buf = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";
        assert_eq!(find_header_end(buf), Some(buf.len() - 4));
    }
}
