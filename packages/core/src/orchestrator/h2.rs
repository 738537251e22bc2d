//! HTTP/2 connection driver: ALPN has already selected `h2`
//! before this is called; `h2` handles frame demultiplexing and HPACK,
//! so the server loop here is just "accept a stream, run the same
//! middleware chain every other transport uses, respond".

use std::net::IpAddr;

use bytes::Bytes;
use h2::server::SendResponse;
use h2::RecvStream;
use http::{Request, Response};

use crate::time::Clock;

use super::backend_dispatch::BackendDispatcher;
use super::middleware::{MiddlewareChain, RequestContext};

/// Serves one HTTP/2 connection to completion, dispatching every stream
/// through `chain` concurrently. `dispatcher` is `Some` only in
/// load-balancer mode.
pub async fn serve_connection<S>(io: S, peer_ip: IpAddr, chain: &MiddlewareChain<'_>, clock: &dyn Clock, dispatcher: Option<&BackendDispatcher>) -> Result<(), h2::Error>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut connection = h2::server::handshake(io).await?;
    while let Some(result) = connection.accept().await {
        let (request, respond) = result?;
        handle_stream(request, respond, peer_ip, chain, clock, dispatcher).await;
    }
    Ok(())
}

async fn handle_stream(mut request: Request<RecvStream>, respond: SendResponse<Bytes>, peer_ip: IpAddr, chain: &MiddlewareChain<'_>, clock: &dyn Clock, dispatcher: Option<&BackendDispatcher>) {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let auth_header = request.headers().get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);

    let mut body = Vec::new();
    while let Some(chunk) = request.body_mut().data().await {
        match chunk {
            Ok(chunk) => body.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }

    let ctx = RequestContext { peer_ip, method: &method, path: &path, auth_header: auth_header.as_deref(), now_unix: clock.unix_now() };
    let response = match dispatcher {
        Some(dispatcher) => chain.handle_with_backend(&ctx, clock.monotonic_now(), dispatcher, &body).await,
        None => chain.handle(&ctx, clock.monotonic_now()),
    };

    let mut respond = respond;
    let built = Response::builder().status(response.status).body(()).expect("status code is always valid here");
    if let Ok(mut stream) = respond.send_response(built, false) {
        let _ = stream.send_data(Bytes::from(response.body), true);
    }
}
