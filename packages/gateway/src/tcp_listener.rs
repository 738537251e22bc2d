//! TCP accept loop for HTTP/1.1 and HTTP/2: accept, TLS handshake,
//! ALPN-based dispatch to whichever connection driver negotiated.

use std::sync::Arc;

use rustls::ServerConfig;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

use blitz_core::orchestrator::{serve_http1_connection, serve_http2_connection};
use blitz_core::time::Clock;

use crate::state::GatewayState;
use crate::tls_setup::TCP_ALPN;

/// Serves TCP connections on `listen` until the process is stopped. Each
/// connection is handled on its own task so one slow peer never blocks
/// another.
pub async fn serve(listen: &str, tls_config: Arc<ServerConfig>, state: Arc<GatewayState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    let acceptor = TlsAcceptor::from(tls_config);
    info!(addr = listen, "TCP listener bound");

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let acceptor = acceptor.clone();
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            let tls_stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(peer = %peer_addr, error = %err, "TLS handshake failed");
                    return;
                }
            };

            let alpn = tls_stream.get_ref().1.alpn_protocol().map(<[u8]>::to_vec);
            let chain = state.chain();
            let dispatcher = state.dispatcher.as_ref();

            let result = match alpn.as_deref() {
                Some(proto) if proto == TCP_ALPN[0] => serve_http2_connection(tls_stream, peer_addr.ip(), &chain, &state.clock as &dyn Clock, dispatcher).await.map_err(std::io::Error::other),
                _ => serve_http1_connection(tls_stream, peer_addr.ip(), &chain, &state.clock as &dyn Clock, dispatcher).await,
            };

            if let Err(err) = result {
                warn!(peer = %peer_addr, error = %err, "connection ended with an error");
            }
        });
    }
}
