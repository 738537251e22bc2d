//! Certificate and private-key loading, building the
//! `rustls::ServerConfig`s the TCP and QUIC listeners hand to their
//! respective TLS engines. ALPN preference order: `h3`, `h2`, `http/1.1`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).with_context(|| format!("opening certificate file {}", path.display()))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>().with_context(|| format!("parsing certificates from {}", path.display()))
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).with_context(|| format!("opening private key file {}", path.display()))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .with_context(|| format!("parsing private key from {}", path.display()))?
        .ok_or_else(|| anyhow::anyhow!("no private key found in {}", path.display()))
}

/// Builds the `ServerConfig` shared by the TCP listener (HTTP/1.1 and
/// HTTP/2, selected by ALPN) and the QUIC listener's [`blitz_core::tls::RustlsEngine`].
pub fn load_server_config(cert_path: &Path, key_path: &Path, alpn: &[&[u8]]) -> Result<Arc<ServerConfig>> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let mut config = ServerConfig::builder().with_no_client_auth().with_single_cert(certs, key).context("building TLS server config")?;
    config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
    Ok(Arc::new(config))
}

/// ALPN preference order for the TCP listener: `h2` then
/// `http/1.1`; `h3` is only ever negotiated over QUIC.
pub const TCP_ALPN: &[&[u8]] = &[b"h2", b"http/1.1"];
pub const QUIC_ALPN: &[&[u8]] = &[b"h3"];
