//! HTTP/1.x connection driver: accept → TLS handshake (owned by
//! the caller, since certificate loading and the socket accept loop are
//! external to this crate) → parse request → middleware chain → dispatch →
//! format response. Operates over any `AsyncRead + AsyncWrite`, so a
//! plain TCP stream in tests and a `tokio_rustls`-wrapped stream in
//! production both work.

use std::net::IpAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::http1::{format_response, parse_request, MAX_REQUEST_SIZE};
use crate::time::Clock;

use super::backend_dispatch::BackendDispatcher;
use super::middleware::{MiddlewareChain, RequestContext};

/// Serves one HTTP/1.1 connection until the peer closes it or a request
/// fails to parse. Keep-alive is the default; each iteration reads a
/// fresh request into a reused buffer. `dispatcher` is `Some` only in
/// load-balancer mode, where a non-built-in path is proxied to a backend
/// rather than answered with 404.
pub async fn serve_connection<S>(mut stream: S, peer_ip: IpAddr, chain: &MiddlewareChain<'_>, clock: &dyn Clock, dispatcher: Option<&BackendDispatcher>) -> std::io::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; MAX_REQUEST_SIZE];
    let mut filled = 0usize;

    loop {
        let request = loop {
            match parse_request(&buf[..filled]) {
                Ok(req) => break Some(req),
                Err(crate::error::Http1Error::Incomplete) => {
                    if filled == buf.len() {
                        return Ok(()); // request too large to ever complete
                    }
                    let n = stream.read(&mut buf[filled..]).await?;
                    if n == 0 {
                        return Ok(());
                    }
                    filled += n;
                }
                Err(_) => break None,
            }
        };

        let Some(request) = request else {
            let mut out = [0u8; 256];
            let len = format_response(&mut out, 400, "Bad Request", &[], None).unwrap_or(0);
            stream.write_all(&out[..len]).await?;
            return Ok(());
        };

        let ctx = RequestContext {
            peer_ip,
            method: request.method.as_str(),
            path: request.path,
            auth_header: request.header("authorization"),
            now_unix: clock.unix_now(),
        };
        let response = match dispatcher {
            Some(dispatcher) => chain.handle_with_backend(&ctx, clock.monotonic_now(), dispatcher, request.body).await,
            None => chain.handle(&ctx, clock.monotonic_now()),
        };

        let mut out = vec![0u8; 4096 + response.body.len()];
        let len = format_response(&mut out, response.status, response.reason, &[], Some(&response.body))
            .unwrap_or_else(|_| {
                out.resize(response.body.len() + 256, 0);
                format_response(&mut out, response.status, response.reason, &[], Some(&response.body)).unwrap_or(0)
            });
        stream.write_all(&out[..len]).await?;

        filled = 0;
    }
}
