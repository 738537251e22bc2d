//! Server-side [`TlsEngine`] backed by `rustls::quic`, the same
//! integration point the wider Rust QUIC ecosystem (e.g. `quinn`) uses to
//! drive a TLS 1.3 handshake inside QUIC without re-implementing the
//! record layer.

use std::sync::Arc;

use ring::aead::quic::AES_128;
use rustls::quic::{Connection as RustlsQuicConnection, KeyChange as RustlsKeyChange, Version as RustlsQuicVersion};
use rustls::ServerConfig;

use super::engine::{DirectionalKeys, KeyChange, Keys, PacketCrypto, TlsEngine};
use crate::error::TlsSeamError;
use crate::quic::header_protection::HeaderProtectionKey;
use crate::quic::space::SpaceId;

/// Wraps a `ring` AEAD key to satisfy [`PacketCrypto`]; rustls hands us
/// the sealing/opening keys as [`rustls::quic::PacketKey`] objects, which
/// already implement the per-packet nonce construction from the IV.
struct RustlsPacketKey(rustls::quic::PacketKey);

impl PacketCrypto for RustlsPacketKey {
    fn seal_in_place(&self, packet_number: u64, header: &[u8], payload_and_tag: &mut Vec<u8>) -> Result<(), TlsSeamError> {
        let tag_len = self.0.tag_len();
        payload_and_tag.resize(payload_and_tag.len() + tag_len, 0);
        let (payload, tag_out) = payload_and_tag.split_at_mut(payload_and_tag.len() - tag_len);
        let tag = self
            .0
            .encrypt_in_place(packet_number, header, payload)
            .map_err(|_| TlsSeamError::Alert("packet seal failed".into()))?;
        tag_out.copy_from_slice(tag.as_ref());
        Ok(())
    }

    fn open_in_place<'a>(&self, packet_number: u64, header: &[u8], payload_and_tag: &'a mut [u8]) -> Result<&'a mut [u8], TlsSeamError> {
        self.0
            .decrypt_in_place(packet_number, header, payload_and_tag)
            .map_err(|_| TlsSeamError::Alert("packet open failed".into()))
    }
}

fn into_directional(keys: rustls::quic::DirectionalKeys) -> Result<DirectionalKeys, TlsSeamError> {
    let header_protection = HeaderProtectionKey::new(&AES_128, keys.header.key_bytes())
        .map_err(|_| TlsSeamError::Alert("header protection key derivation failed".into()))?;
    Ok(DirectionalKeys { packet: Box::new(RustlsPacketKey(keys.packet)), header_protection })
}

fn into_key_change(change: RustlsKeyChange) -> Result<KeyChange, TlsSeamError> {
    match change {
        RustlsKeyChange::Handshake { keys } => Ok(KeyChange::Handshake {
            keys: Keys { local: into_directional(keys.local)?, remote: into_directional(keys.remote)? },
        }),
        RustlsKeyChange::OneRtt { keys, .. } => Ok(KeyChange::OneRtt {
            keys: Keys { local: into_directional(keys.local)?, remote: into_directional(keys.remote)? },
        }),
    }
}

pub struct RustlsEngine {
    conn: RustlsQuicConnection,
}

impl RustlsEngine {
    pub fn new_server(config: Arc<ServerConfig>, transport_params: Vec<u8>) -> Result<Self, TlsSeamError> {
        let server = rustls::quic::ServerConnection::new(config, RustlsQuicVersion::V1, transport_params)
            .map_err(TlsSeamError::Rustls)?;
        Ok(Self { conn: RustlsQuicConnection::Server(server) })
    }
}

impl TlsEngine for RustlsEngine {
    fn read_handshake(&mut self, _space: SpaceId, data: &[u8]) -> Result<(), TlsSeamError> {
        self.conn.read_hs(data).map_err(TlsSeamError::Rustls)?;
        if let Some(alert) = self.conn.alert() {
            return Err(TlsSeamError::Alert(format!("{alert:?}")));
        }
        Ok(())
    }

    fn write_handshake(&mut self, _space: SpaceId, out: &mut Vec<u8>) -> Result<Option<KeyChange>, TlsSeamError> {
        match self.conn.write_hs(out) {
            Some(change) => into_key_change(change).map(Some),
            None => Ok(None),
        }
    }

    fn is_handshaking(&self) -> bool {
        match &self.conn {
            RustlsQuicConnection::Client(c) => c.is_handshaking(),
            RustlsQuicConnection::Server(s) => s.is_handshaking(),
        }
    }

    fn alpn_protocol(&self) -> Option<&[u8]> {
        match &self.conn {
            RustlsQuicConnection::Client(c) => c.alpn_protocol(),
            RustlsQuicConnection::Server(s) => s.alpn_protocol(),
        }
    }
}
