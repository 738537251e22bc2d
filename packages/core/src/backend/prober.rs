//! Active backend health probing. Independent of live traffic: on a
//! fixed interval, issues a GET to each backend's configured
//! `health_check_path` and feeds the result into its [`Health`] tracker,
//! so a backend round-robin dispatch is routing around can still recover
//! without waiting for a live request to land on it.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::pool::BackendPool;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs forever, probing every backend with a configured health-check
/// path once per `interval`. Backends without one are left to passive,
/// live-traffic-driven health tracking.
pub async fn run(pool: &BackendPool, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        for index in 0..pool.len() {
            let Some(backend) = pool.get(index) else { continue };
            let Some(path) = backend.health_check_path.as_deref() else { continue };
            match probe_once(&backend.host, backend.port, path).await {
                Ok(true) => backend.health.record_success(),
                Ok(false) | Err(_) => backend.health.record_failure(),
            }
        }
    }
}

async fn probe_once(host: &str, port: u16, path: &str) -> std::io::Result<bool> {
    let connect = TcpStream::connect((host, port));
    let mut stream = tokio::time::timeout(PROBE_TIMEOUT, connect).await.map_err(|_| timeout_error("connect"))??;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    tokio::time::timeout(PROBE_TIMEOUT, stream.write_all(request.as_bytes())).await.map_err(|_| timeout_error("write"))??;

    let mut buf = [0u8; 64];
    let n = tokio::time::timeout(PROBE_TIMEOUT, stream.read(&mut buf)).await.map_err(|_| timeout_error("read"))??;
    if n == 0 {
        return Ok(false);
    }

    let status_line = std::str::from_utf8(&buf[..n]).unwrap_or("");
    let status: Option<u16> = status_line.split_whitespace().nth(1).and_then(|s| s.parse().ok());
    Ok(matches!(status, Some(200..=299)))
}

fn timeout_error(stage: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::TimedOut, format!("health probe {stage} timed out"))
}
